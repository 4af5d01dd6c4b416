//! Navigation controller: turns pages until the next-page control disappears.

pub mod settle;

pub use settle::Settle;

use crate::config::NavigationConfig;
use crate::results::NavigationOutcome;
use crate::sessions::{ButtonSnapshot, NextControl};

/// Classification of the next-page control, re-derived on every step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationState {
    /// Visible and enabled: turn the page
    Clickable,
    /// Visible but blocked, usually by an interstitial ad page
    Disabled,
    /// Gone or hidden: last page reached
    Missing,
}

/// Classify a snapshot of the next-page control
pub fn classify(snapshot: Option<&ButtonSnapshot>, disabled_class: &str) -> NavigationState {
    let Some(button) = snapshot else {
        return NavigationState::Missing;
    };

    let style = normalize_style(&button.style);
    if !button.visible || style.contains("display:none") || style.contains("visibility:hidden") {
        return NavigationState::Missing;
    }

    let aria_disabled = button
        .aria_disabled
        .as_deref()
        .is_some_and(|value| value.trim().eq_ignore_ascii_case("true"));
    let disabled_by_class = button
        .class
        .split_whitespace()
        .any(|class| class == disabled_class);

    if button.disabled
        || aria_disabled
        || disabled_by_class
        || style.contains("pointer-events:none")
    {
        return NavigationState::Disabled;
    }

    NavigationState::Clickable
}

/// Lowercase a style attribute and drop all whitespace so `display : none` matches
fn normalize_style(style: &str) -> String {
    style
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Read and classify the control. Read errors count as `Missing` so we never click blindly.
pub async fn analyze_next_button<C: NextControl>(
    control: &C,
    disabled_class: &str,
) -> NavigationState {
    match control.snapshot().await {
        Ok(snapshot) => classify(snapshot.as_ref(), disabled_class),
        Err(e) => {
            ::log::warn!("Could not read next-page control, assuming last page: {}", e);
            NavigationState::Missing
        }
    }
}

/// Walk the whole issue.
///
/// The capture listener must already be attached; `settle` observes its progress.
pub async fn navigate_all_pages<C: NextControl>(
    control: &C,
    config: &NavigationConfig,
    settle: &mut Settle,
) -> NavigationOutcome {
    ::log::info!("Starting navigation driven by next-page control state");

    ::log::info!(
        "Initial wait for first page documents ({} ms)...",
        config.initial_wait_ms
    );
    settle.wait(config.initial_wait()).await;
    ::log::info!("Pages saved after initial wait: {}", settle.captured());

    let mut step = 0;
    let outcome = loop {
        if step >= config.max_steps {
            ::log::warn!(
                "Step ceiling of {} reached before the last page; capture is likely incomplete",
                config.max_steps
            );
            break NavigationOutcome::StepCeiling { steps: step };
        }

        let state = analyze_next_button(control, &config.disabled_class).await;
        ::log::info!(
            "Navigation step {}: control {:?}, distinct pages so far: {}",
            step,
            state,
            settle.captured()
        );

        match state {
            NavigationState::Clickable => {
                ::log::info!("Next-page control clickable; clicking");
                if let Err(e) = control.click().await {
                    ::log::warn!("Click on next-page control failed: {}", e);
                }
                settle.wait(config.click_wait()).await;
            }
            NavigationState::Disabled => {
                ::log::info!("Next-page control disabled (likely an ad page); waiting");
                settle.wait(config.interstitial_wait()).await;
            }
            NavigationState::Missing => {
                ::log::info!("Next-page control missing; assuming last page");
                break NavigationOutcome::LastPage { steps: step };
            }
        }

        step += 1;
    };

    ::log::info!(
        "Final wait for remaining page documents ({} ms)...",
        config.final_wait_ms
    );
    settle.wait(config.final_wait()).await;
    ::log::info!(
        "Finished navigation after {} steps. Total pages saved: {}",
        outcome.steps(),
        settle.captured()
    );

    outcome
}
