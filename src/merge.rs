//! Merge assembler: concatenates captured page documents into the issue.

use crate::error::{Error, Result};
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Page attributes a page may inherit from its ancestors in the page tree
const INHERITABLE_ATTRIBUTES: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Deepest page tree we follow when collecting inherited attributes
const MAX_TREE_DEPTH: usize = 32;

/// What a merge produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeReport {
    pub output_path: PathBuf,
    /// Number of input documents
    pub documents: usize,
    /// Total pages written
    pub pages: usize,
}

/// Merge the documents at `inputs`, in order, into `output_path`.
///
/// Every page of every input is kept. A missing or unreadable input aborts the merge
/// before anything is written.
pub fn merge_documents(inputs: &[PathBuf], output_path: &Path) -> Result<MergeReport> {
    if inputs.is_empty() {
        return Err(Error::NothingToMerge);
    }

    ::log::info!(
        "Merging {} documents into {}...",
        inputs.len(),
        output_path.display()
    );

    for path in inputs {
        if !path.exists() {
            return Err(Error::FileNotFound(path.clone()));
        }
    }

    let mut documents: Vec<Document> = Vec::with_capacity(inputs.len());
    for path in inputs {
        ::log::info!("Adding {}", path.display());
        let doc = Document::load(path)?;
        if doc.get_pages().is_empty() {
            return Err(Error::EmptyDocument(path.clone()));
        }
        documents.push(doc);
    }

    let mut max_id = 1;
    let mut page_ids: Vec<ObjectId> = Vec::new();
    let mut objects: BTreeMap<ObjectId, Object> = BTreeMap::new();

    for mut doc in documents {
        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;

        let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
        for &page_id in &pages {
            inherit_page_attributes(&mut doc, page_id)?;
        }
        page_ids.extend(pages);

        objects.extend(doc.objects);
    }

    let mut merged = Document::with_version("1.5");
    merged.objects.extend(objects);
    // New ids must land above everything imported
    merged.max_id = max_id - 1;

    let pages_id = merged.new_object_id();
    let kids: Vec<Object> = page_ids.iter().map(|&id| Object::Reference(id)).collect();

    let mut pages = Dictionary::new();
    pages.set("Type", Object::Name(b"Pages".to_vec()));
    pages.set("Count", Object::Integer(page_ids.len() as i64));
    pages.set("Kids", Object::Array(kids));

    let catalog_id = merged.new_object_id();
    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));

    merged.objects.insert(catalog_id, Object::Dictionary(catalog));
    merged.objects.insert(pages_id, Object::Dictionary(pages));
    merged.trailer.set("Root", Object::Reference(catalog_id));

    for &page_id in &page_ids {
        if let Ok(Object::Dictionary(page)) = merged.get_object_mut(page_id) {
            page.set("Parent", Object::Reference(pages_id));
        }
    }

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    merged.compress();
    merged.save(output_path)?;

    ::log::info!(
        "Merged document saved to {} ({} pages)",
        output_path.display(),
        page_ids.len()
    );

    Ok(MergeReport {
        output_path: output_path.to_path_buf(),
        documents: inputs.len(),
        pages: page_ids.len(),
    })
}

/// Copy attributes the page inherits from its page tree onto the page itself,
/// so they survive re-parenting under the merged tree.
fn inherit_page_attributes(doc: &mut Document, page_id: ObjectId) -> Result<()> {
    let mut inherited: Vec<(&[u8], Object)> = Vec::new();
    {
        let page = doc.get_dictionary(page_id)?;
        let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
        let mut depth = 0;

        while let Some(parent_id) = parent {
            if depth >= MAX_TREE_DEPTH {
                break;
            }
            let Ok(node) = doc.get_dictionary(parent_id) else {
                break;
            };

            for key in INHERITABLE_ATTRIBUTES {
                let already = page.has(key) || inherited.iter().any(|(k, _)| *k == key);
                if already {
                    continue;
                }
                if let Ok(value) = node.get(key) {
                    inherited.push((key, value.clone()));
                }
            }

            parent = node.get(b"Parent").and_then(Object::as_reference).ok();
            depth += 1;
        }
    }

    if inherited.is_empty() {
        return Ok(());
    }

    let page = doc.get_dictionary_mut(page_id)?;
    for (key, value) in inherited {
        page.set(key, value);
    }
    Ok(())
}

/// Number of pages in a document on disk
pub fn count_pages(path: &Path) -> Result<usize> {
    let doc = Document::load(path)?;
    Ok(doc.get_pages().len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::fixtures::{labelled_pdf, page_labels};

    fn write(dir: &Path, name: &str, labels: &[&str]) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, labelled_pdf(labels)).unwrap();
        path
    }

    #[test]
    fn test_merge_keeps_input_order_and_every_page() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = vec![
            write(dir.path(), "page_001.pdf", &["1a", "1b"]),
            write(dir.path(), "page_002.pdf", &["2a"]),
            write(dir.path(), "page_003.pdf", &["3a", "3b", "3c"]),
        ];
        let output = dir.path().join("issue.pdf");

        let report = merge_documents(&inputs, &output).unwrap();
        assert_eq!(report.documents, 3);
        assert_eq!(report.pages, 6);
        assert_eq!(count_pages(&output).unwrap(), 6);
        assert_eq!(page_labels(&output), vec!["1a", "1b", "2a", "3a", "3b", "3c"]);
    }

    #[test]
    fn test_merge_follows_list_not_file_names() {
        let dir = tempfile::tempdir().unwrap();
        let first = write(dir.path(), "page_001.pdf", &["one"]);
        let second = write(dir.path(), "page_002.pdf", &["two"]);
        let output = dir.path().join("out").join("issue.pdf");

        merge_documents(&[second, first], &output).unwrap();
        assert_eq!(page_labels(&output), vec!["two", "one"]);
    }

    #[test]
    fn test_inherited_attributes_survive_merge() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = vec![
            write(dir.path(), "a.pdf", &["a"]),
            write(dir.path(), "b.pdf", &["b"]),
        ];
        let output = dir.path().join("issue.pdf");
        merge_documents(&inputs, &output).unwrap();

        let doc = Document::load(&output).unwrap();
        for page_id in doc.get_pages().into_values() {
            let page = doc.get_dictionary(page_id).unwrap();
            assert!(page.has(b"Resources"));
            assert!(page.has(b"MediaBox"));
        }
    }

    #[test]
    fn test_missing_input_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let present = write(dir.path(), "page_001.pdf", &["1"]);
        let missing = dir.path().join("page_002.pdf");
        let output = dir.path().join("issue.pdf");

        let err = merge_documents(&[present, missing.clone()], &output).unwrap_err();
        assert!(matches!(err, Error::FileNotFound(path) if path == missing));
        assert!(!output.exists());
    }

    #[test]
    fn test_unreadable_input_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let garbage = dir.path().join("page_001.pdf");
        std::fs::write(&garbage, b"<html>session expired</html>").unwrap();
        let output = dir.path().join("issue.pdf");

        assert!(merge_documents(&[garbage], &output).is_err());
        assert!(!output.exists());
    }

    #[test]
    fn test_empty_list_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = merge_documents(&[], &dir.path().join("issue.pdf")).unwrap_err();
        assert!(matches!(err, Error::NothingToMerge));
    }
}
