use crate::capture::{ObservedResponse, ResponseSink};
use crate::config::CaptureConfig;
use crate::error::{Error, Result};
use crate::sessions::{ButtonSnapshot, NextControl, Subscription, ViewerSession};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::Value;
use std::time::Duration;

/// Installs a resource observer in the viewer page (once per document) and
/// returns the URLs of every response recorded since the previous call.
const DRAIN_RESPONSES_JS: &str = r#"
if (!window.__paperCapture) {
    window.__paperCapture = [];
    performance.setResourceTimingBufferSize(100000);
    new PerformanceObserver(function (list) {
        for (const entry of list.getEntries()) {
            window.__paperCapture.push(entry.name);
        }
    }).observe({ type: 'resource', buffered: true });
}
return window.__paperCapture.splice(0);
"#;

/// Fetches a URL from inside the page (cookies included) and hands back its
/// bytes as base64, or an error message.
const FETCH_BODY_JS: &str = r#"
const url = arguments[0];
const done = arguments[arguments.length - 1];
fetch(url, { credentials: 'include' })
    .then(function (response) {
        if (!response.ok) {
            throw new Error('HTTP ' + response.status);
        }
        return response.arrayBuffer();
    })
    .then(function (buffer) {
        const bytes = new Uint8Array(buffer);
        let binary = '';
        for (let i = 0; i < bytes.length; i += 0x8000) {
            binary += String.fromCharCode.apply(null, bytes.subarray(i, i + 0x8000));
        }
        done({ body: btoa(binary) });
    })
    .catch(function (error) {
        done({ error: String(error) });
    });
"#;

/// Connects to the WebDriver instance, falling back to the usual local ports
pub async fn connect_to_webdriver(webdriver_url: &str) -> Result<Client> {
    match ClientBuilder::native().connect(webdriver_url).await {
        Ok(client) => {
            ::log::debug!("Connected to WebDriver at {}", webdriver_url);
            return Ok(client);
        }
        Err(e) => {
            ::log::error!(
                "Failed to connect to WebDriver at {}: {}",
                webdriver_url,
                e
            );
        }
    }

    let fallback_urls = [
        "http://localhost:9515", // ChromeDriver default
        "http://localhost:4444", // geckodriver / Selenium default
        "http://127.0.0.1:4444", // Try with IP instead of localhost
    ];

    for url in fallback_urls.iter() {
        if *url == webdriver_url {
            continue;
        }

        ::log::info!("Trying fallback WebDriver URL: {}", url);
        if let Ok(client) = ClientBuilder::native().connect(url).await {
            ::log::debug!("Connected to fallback WebDriver at {}", url);
            return Ok(client);
        }
    }

    ::log::error!(
        "Make sure a WebDriver server is running or set the WEBDRIVER_URL environment variable"
    );
    Err(Error::Connect(webdriver_url.to_string()))
}

/// A viewer session driven through WebDriver
#[derive(Clone)]
pub struct WebDriverSession {
    client: Client,
    next_button_xpath: String,
    poll_interval: Duration,
    body_timeout: Duration,
}

impl WebDriverSession {
    /// Connect to the configured WebDriver server and open a new browser session
    pub async fn connect(config: &CaptureConfig) -> Result<Self> {
        let client = connect_to_webdriver(&config.webdriver.url).await?;
        Ok(Self::from_client(client, config))
    }

    /// Wrap an existing WebDriver client
    pub fn from_client(client: Client, config: &CaptureConfig) -> Self {
        Self {
            client,
            next_button_xpath: config.navigation.next_button_xpath.clone(),
            poll_interval: Duration::from_millis(config.webdriver.poll_interval_ms.max(1)),
            body_timeout: Duration::from_millis(config.webdriver.body_timeout_ms),
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub async fn goto(&self, url: &str) -> Result<()> {
        ::log::info!("Opening {}", url);
        self.client.goto(url).await?;
        Ok(())
    }

    /// Switch to the most recently opened window; the viewer opens in a new tab
    pub async fn focus_latest_window(&self) -> Result<()> {
        let mut windows = self.client.windows().await?;
        if let Some(latest) = windows.pop() {
            self.client.switch_to_window(latest).await?;
            ::log::debug!("Switched to the most recent of {} windows", windows.len() + 1);
        }
        Ok(())
    }

    /// End the browser session
    pub async fn close(self) -> Result<()> {
        self.client.close().await?;
        Ok(())
    }
}

/// Drain the in-page response log
async fn drain_response_urls(client: &Client) -> Result<Vec<String>> {
    let value = client.execute(DRAIN_RESPONSES_JS, Vec::new()).await?;
    let urls = match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    };
    Ok(urls)
}

impl NextControl for WebDriverSession {
    async fn snapshot(&self) -> Result<Option<ButtonSnapshot>> {
        let buttons = self
            .client
            .find_all(Locator::XPath(&self.next_button_xpath))
            .await?;
        let Some(button) = buttons.first() else {
            return Ok(None);
        };

        Ok(Some(ButtonSnapshot {
            visible: button.is_displayed().await?,
            style: button.attr("style").await?.unwrap_or_default(),
            disabled: button.attr("disabled").await?.is_some(),
            aria_disabled: button.attr("aria-disabled").await?,
            class: button.attr("class").await?.unwrap_or_default(),
        }))
    }

    async fn click(&self) -> Result<()> {
        self.client
            .find(Locator::XPath(&self.next_button_xpath))
            .await?
            .click()
            .await?;
        Ok(())
    }
}

impl ViewerSession for WebDriverSession {
    type Response = WebDriverResponse;

    async fn subscribe(&self, sink: ResponseSink<WebDriverResponse>) -> Result<Subscription> {
        // Install the observer now so nothing loaded from here on is missed
        let initial = drain_response_urls(&self.client).await?;

        let client = self.client.clone();
        let poll_interval = self.poll_interval;
        let body_timeout = self.body_timeout;

        let task = tokio::spawn(async move {
            let mut pending = initial;
            loop {
                for url in pending.drain(..) {
                    let response = WebDriverResponse {
                        client: client.clone(),
                        url,
                        timeout: body_timeout,
                    };
                    if sink.send(response).is_err() {
                        ::log::debug!("Capture listener closed, stopping response feed");
                        return;
                    }
                }

                tokio::time::sleep(poll_interval).await;

                match drain_response_urls(&client).await {
                    Ok(urls) => pending = urls,
                    // The viewer may be mid-navigation; try again next tick
                    Err(e) => ::log::debug!("Could not poll viewer responses: {}", e),
                }
            }
        });

        Ok(Subscription::from_task(task))
    }
}

/// A response seen by the in-page observer
pub struct WebDriverResponse {
    client: Client,
    url: String,
    timeout: Duration,
}

impl ObservedResponse for WebDriverResponse {
    fn url(&self) -> &str {
        &self.url
    }

    async fn body(&self) -> Result<Vec<u8>> {
        let fetch = self
            .client
            .execute_async(FETCH_BODY_JS, vec![Value::String(self.url.clone())]);
        let value = tokio::time::timeout(self.timeout, fetch)
            .await
            .map_err(|_| Error::body(&self.url, "timed out"))??;

        decode_body(&self.url, &value)
    }
}

/// Decode the `{ body }` / `{ error }` object returned by the fetch script
fn decode_body(url: &str, value: &Value) -> Result<Vec<u8>> {
    if let Some(reason) = value.get("error").and_then(Value::as_str) {
        return Err(Error::body(url, reason));
    }
    let encoded = value
        .get("body")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::body(url, "fetch script returned no body"))?;
    let bytes = STANDARD
        .decode(encoded)
        .map_err(|e| Error::body(url, e))?;
    if bytes.is_empty() {
        return Err(Error::body(url, "empty body"));
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const URL: &str = "https://cdn.example.com/OPS/p1_pdf.pdf";

    #[test]
    fn test_decode_body() {
        let value = json!({ "body": STANDARD.encode(b"%PDF-1.5 page") });
        assert_eq!(decode_body(URL, &value).unwrap(), b"%PDF-1.5 page");
    }

    #[test]
    fn test_decode_body_failures_are_transient_errors() {
        for value in [
            json!({ "error": "TypeError: Failed to fetch" }),
            json!({ "body": "" }),
            json!({ "body": "not base64!" }),
            json!(null),
        ] {
            let err = decode_body(URL, &value).unwrap_err();
            assert!(matches!(err, Error::Body { .. }), "{value}: {err}");
        }
    }
}
