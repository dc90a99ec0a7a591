use async_trait::async_trait;
use thiserror::Error;

pub const POPUP_NAME: &str = "HubSpot Authorization";
pub const POPUP_FEATURES: &str = "width=600, height=600";

#[derive(Error, Debug)]
pub enum PopupError {
    #[error("No browser window available")]
    NoWindow,
    #[error("Failed to open popup: {0}")]
    Open(String),
}

/// A window opened for the authorization handshake.
pub trait PopupWindow {
    fn is_closed(&self) -> bool;
}

#[cfg_attr(test, mockall::automock)]
pub trait PopupLauncher {
    /// `Ok(None)` means the window could not be opened (e.g. a popup
    /// blocker), which the caller treats as already closed.
    fn open(
        &self,
        url: &str,
        name: &str,
        features: &str,
    ) -> Result<Option<Box<dyn PopupWindow>>, PopupError>;
}

/// Fixed-period timer driving the closure check.
#[async_trait(?Send)]
pub trait Ticker {
    async fn tick(&mut self);
}

/// Waits until `popup` reports closed, checking once per tick. A missing
/// popup counts as closed on the first check. Returns the number of checks.
///
/// The future holds no resources besides the ticker, so dropping or aborting
/// it stops the polling.
pub async fn wait_until_closed<T>(popup: Option<&dyn PopupWindow>, ticker: &mut T) -> u32
where
    T: Ticker + ?Sized,
{
    let mut checks = 0;
    loop {
        ticker.tick().await;
        checks += 1;
        if popup.map_or(true, |window| window.is_closed()) {
            return checks;
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use native::IntervalTicker;

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use super::Ticker;
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

    /// Tokio-backed ticker. The first tick fires one period after creation,
    /// like `setInterval`. Must be created inside a runtime.
    pub struct IntervalTicker(Interval);

    impl IntervalTicker {
        pub fn new(period: Duration) -> Self {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            Self(interval)
        }
    }

    #[async_trait(?Send)]
    impl Ticker for IntervalTicker {
        async fn tick(&mut self) {
            self.0.tick().await;
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub use browser::{BrowserLauncher, TimeoutTicker};

#[cfg(target_arch = "wasm32")]
mod browser {
    use super::{PopupError, PopupLauncher, PopupWindow, Ticker};
    use async_trait::async_trait;
    use gloo_timers::future::TimeoutFuture;
    use std::time::Duration;

    struct BrowserPopup(web_sys::Window);

    impl PopupWindow for BrowserPopup {
        fn is_closed(&self) -> bool {
            // A window we can no longer query is as good as closed
            self.0.closed().unwrap_or(true)
        }
    }

    /// Opens popups through `window.open`.
    pub struct BrowserLauncher;

    impl PopupLauncher for BrowserLauncher {
        fn open(
            &self,
            url: &str,
            name: &str,
            features: &str,
        ) -> Result<Option<Box<dyn PopupWindow>>, PopupError> {
            let window = web_sys::window().ok_or(PopupError::NoWindow)?;
            let popup = window
                .open_with_url_and_target_and_features(url, name, features)
                .map_err(|e| PopupError::Open(format!("{:?}", e)))?;
            Ok(popup.map(|w| Box::new(BrowserPopup(w)) as Box<dyn PopupWindow>))
        }
    }

    pub struct TimeoutTicker {
        period_ms: u32,
    }

    impl TimeoutTicker {
        pub fn new(period: Duration) -> Self {
            Self {
                period_ms: period.as_millis().min(u32::MAX as u128) as u32,
            }
        }
    }

    #[async_trait(?Send)]
    impl Ticker for TimeoutTicker {
        async fn tick(&mut self) {
            TimeoutFuture::new(self.period_ms).await;
        }
    }
}
