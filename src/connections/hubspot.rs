//! HubSpot connection widget, independent of how it is rendered.
//!
//! `HubspotState` holds the three UI flags and only changes through
//! `HubspotAction`s. `HubspotConnector` runs the backend calls and reports
//! back through a `WidgetHost`, which the Yew view, the CLI and the tests each
//! implement.

use futures::future::{AbortRegistration, Abortable};

use crate::models::integration::{
    Credentials, IntegrationEntry, IntegrationParams, LoadedItems, HUBSPOT_KEY,
};
use crate::utils::api::{ApiError, IntegrationBackend};
use crate::utils::popup::{
    wait_until_closed, PopupLauncher, Ticker, POPUP_FEATURES, POPUP_NAME,
};

pub const CONNECT_ERROR: &str = "Error connecting to HubSpot.";
pub const CREDENTIALS_ERROR: &str = "Error fetching HubSpot credentials.";
pub const LOAD_ERROR: &str = "Error loading HubSpot items.";
pub const MISSING_CREDENTIALS: &str = "HubSpot credentials not found. Please connect first.";

#[derive(Clone, Debug, Default, PartialEq)]
pub struct HubspotState {
    pub is_connected: bool,
    pub is_connecting: bool,
    pub loaded_items: LoadedItems,
}

#[derive(Clone, Debug, PartialEq)]
pub enum HubspotAction {
    ConnectStarted,
    /// The connect attempt ended without new credentials.
    ConnectFinished,
    Connected,
    ItemsLoaded(LoadedItems),
    ItemsCleared,
    /// The parent's params changed; carries whether hubspot credentials are
    /// present in them now.
    ParamsChanged(bool),
}

impl HubspotState {
    pub fn from_params(params: &IntegrationParams) -> Self {
        Self {
            is_connected: params.has_credentials(HUBSPOT_KEY),
            ..Self::default()
        }
    }

    pub fn apply(mut self, action: HubspotAction) -> Self {
        match action {
            HubspotAction::ConnectStarted => {
                self.is_connecting = true;
            }
            HubspotAction::ConnectFinished => {
                self.is_connecting = false;
            }
            HubspotAction::Connected => {
                self.is_connecting = false;
                self.is_connected = true;
            }
            HubspotAction::ItemsLoaded(items) => {
                self.loaded_items = items;
            }
            HubspotAction::ItemsCleared => {
                self.loaded_items = LoadedItems::default();
            }
            HubspotAction::ParamsChanged(has_credentials) => {
                self.is_connected = has_credentials;
            }
        }
        self
    }
}

/// Whatever owns the widget: applies actions, shows blocking alerts and keeps
/// the parent's integration params.
#[cfg_attr(test, mockall::automock)]
pub trait WidgetHost {
    fn dispatch(&self, action: HubspotAction);
    fn alert(&self, message: &str);
    /// Asks the owner of the params to store `entry` under `key`.
    fn merge_integration(&self, key: &str, entry: IntegrationEntry);
    /// Error log visible to whoever runs the widget: the browser console or
    /// the CLI's tracing output.
    fn log_error(&self, message: &str);
}

/// Recomputes the connected flag from the parent's params. Call it whenever
/// they change.
pub fn sync_connected<H: WidgetHost + ?Sized>(host: &H, params: &IntegrationParams) {
    host.dispatch(HubspotAction::ParamsChanged(
        params.has_credentials(HUBSPOT_KEY),
    ));
}

#[derive(Clone, Debug, PartialEq)]
pub enum ConnectOutcome {
    Connected(Credentials),
    /// The backend answered but had nothing stored for this user/org.
    NoCredentials,
    /// The flow was aborted before credentials reached the host.
    Cancelled,
    Failed,
}

pub struct HubspotConnector<B> {
    backend: B,
    user_id: String,
    org_id: String,
}

impl<B: IntegrationBackend> HubspotConnector<B> {
    pub fn new(backend: B, user_id: impl Into<String>, org_id: impl Into<String>) -> Self {
        Self {
            backend,
            user_id: user_id.into(),
            org_id: org_id.into(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Full connect flow: authorize, open the popup, wait for it to close,
    /// then exchange the session for credentials.
    ///
    /// Firing `abort` stops the flow at whichever step it is in. An abort that
    /// lands before the popup opens never opens it, and an aborted flow never
    /// hands credentials to the host.
    pub async fn connect<H, L, T>(
        &self,
        host: &H,
        launcher: &L,
        ticker: &mut T,
        abort: AbortRegistration,
    ) -> ConnectOutcome
    where
        H: WidgetHost + ?Sized,
        L: PopupLauncher + ?Sized,
        T: Ticker + ?Sized,
    {
        host.dispatch(HubspotAction::ConnectStarted);

        match Abortable::new(self.run_connect(host, launcher, ticker), abort).await {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::info!("HubSpot connect cancelled");
                host.dispatch(HubspotAction::ConnectFinished);
                ConnectOutcome::Cancelled
            }
        }
    }

    async fn run_connect<H, L, T>(&self, host: &H, launcher: &L, ticker: &mut T) -> ConnectOutcome
    where
        H: WidgetHost + ?Sized,
        L: PopupLauncher + ?Sized,
        T: Ticker + ?Sized,
    {
        tracing::info!("Requesting HubSpot authorization URL for user {} in org {}", self.user_id, self.org_id);

        let auth_url = match self.backend.authorize(&self.user_id, &self.org_id).await {
            Ok(url) => url,
            Err(e) => {
                tracing::error!("HubSpot authorize failed: {}", e);
                host.dispatch(HubspotAction::ConnectFinished);
                host.alert(e.user_message(CONNECT_ERROR));
                return ConnectOutcome::Failed;
            }
        };

        let popup = match launcher.open(&auth_url, POPUP_NAME, POPUP_FEATURES) {
            Ok(popup) => popup,
            Err(e) => {
                tracing::error!("Failed to open HubSpot authorization window: {}", e);
                host.dispatch(HubspotAction::ConnectFinished);
                host.alert(CONNECT_ERROR);
                return ConnectOutcome::Failed;
            }
        };
        if popup.is_none() {
            tracing::warn!("Authorization window was blocked, checking credentials right away");
        }

        let checks = wait_until_closed(popup.as_deref(), ticker).await;
        tracing::debug!("Authorization window closed after {} checks", checks);

        self.on_popup_closed(host).await
    }

    /// Exchanges the finished session for credentials and hands them to the
    /// host. Always clears the connecting flag.
    pub async fn on_popup_closed<H: WidgetHost + ?Sized>(&self, host: &H) -> ConnectOutcome {
        match self.backend.credentials(&self.user_id, &self.org_id).await {
            Ok(Some(credentials)) => {
                tracing::info!("HubSpot connected for user {} in org {}", self.user_id, self.org_id);
                host.merge_integration(HUBSPOT_KEY, IntegrationEntry::hubspot(credentials.clone()));
                host.dispatch(HubspotAction::Connected);
                ConnectOutcome::Connected(credentials)
            }
            Ok(None) => {
                tracing::warn!("Backend returned no HubSpot credentials");
                host.dispatch(HubspotAction::ConnectFinished);
                ConnectOutcome::NoCredentials
            }
            Err(e) => {
                tracing::error!("Fetching HubSpot credentials failed: {}", e);
                host.dispatch(HubspotAction::ConnectFinished);
                host.alert(e.user_message(CREDENTIALS_ERROR));
                ConnectOutcome::Failed
            }
        }
    }

    /// Loads items with the credentials stored in `params`. Returns what was
    /// handed to the host for display.
    pub async fn load_items<H: WidgetHost + ?Sized>(
        &self,
        host: &H,
        params: &IntegrationParams,
    ) -> Option<LoadedItems> {
        let Some(credentials) = params.credentials(HUBSPOT_KEY) else {
            host.log_error(MISSING_CREDENTIALS);
            host.alert(MISSING_CREDENTIALS);
            return None;
        };

        let loaded = self
            .backend
            .load(&credentials)
            .await
            .and_then(|payload| LoadedItems::from_payload(&payload).map_err(ApiError::from));

        match loaded {
            Ok(items) => {
                tracing::info!("Loaded HubSpot items: {}", items.summary());
                host.dispatch(HubspotAction::ItemsLoaded(items.clone()));
                Some(items)
            }
            Err(e) => {
                host.log_error(&format!("Error loading HubSpot items: {}", e));
                host.alert(e.user_message(LOAD_ERROR));
                None
            }
        }
    }
}

/// Empties the displayed items. Never touches the backend.
pub fn clear_items<H: WidgetHost + ?Sized>(host: &H) {
    host.dispatch(HubspotAction::ItemsCleared);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::popup::{MockPopupLauncher, PopupError, PopupWindow};
    use async_trait::async_trait;
    use futures::future::AbortHandle;
    use mockall::predicate::eq;
    use serde_json::{json, Value};
    use std::cell::{Cell, RefCell};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    const AUTH_URL: &str = "https://app.hubspot.com/oauth/authorize?client_id=abc&state=xyz";

    #[derive(Default)]
    struct FakeBackend {
        authorize_result: RefCell<Option<Result<String, ApiError>>>,
        credentials_result: RefCell<Option<Result<Option<Credentials>, ApiError>>>,
        load_result: RefCell<Option<Result<Value, ApiError>>>,
        authorize_calls: Cell<u32>,
        credentials_calls: Cell<u32>,
        load_calls: RefCell<Vec<Credentials>>,
    }

    impl FakeBackend {
        fn authorizing() -> Self {
            let backend = Self::default();
            *backend.authorize_result.borrow_mut() = Some(Ok(AUTH_URL.to_string()));
            backend
        }

        fn with_credentials(self, result: Result<Option<Credentials>, ApiError>) -> Self {
            *self.credentials_result.borrow_mut() = Some(result);
            self
        }

        fn with_load(self, result: Result<Value, ApiError>) -> Self {
            *self.load_result.borrow_mut() = Some(result);
            self
        }
    }

    #[async_trait(?Send)]
    impl IntegrationBackend for FakeBackend {
        async fn authorize(&self, user_id: &str, org_id: &str) -> Result<String, ApiError> {
            assert_eq!((user_id, org_id), ("TestUser", "TestOrg"));
            self.authorize_calls.set(self.authorize_calls.get() + 1);
            self.authorize_result
                .borrow_mut()
                .take()
                .expect("unexpected authorize call")
        }

        async fn credentials(
            &self,
            user_id: &str,
            org_id: &str,
        ) -> Result<Option<Credentials>, ApiError> {
            assert_eq!((user_id, org_id), ("TestUser", "TestOrg"));
            self.credentials_calls.set(self.credentials_calls.get() + 1);
            self.credentials_result
                .borrow_mut()
                .take()
                .expect("unexpected credentials call")
        }

        async fn load(&self, credentials: &Credentials) -> Result<Value, ApiError> {
            self.load_calls.borrow_mut().push(credentials.clone());
            self.load_result
                .borrow_mut()
                .take()
                .expect("unexpected load call")
        }
    }

    /// Host that records everything, for flows where exact call order matters
    /// less than the resulting state.
    #[derive(Default)]
    struct RecordingHost {
        state: RefCell<HubspotState>,
        params: RefCell<IntegrationParams>,
        alerts: RefCell<Vec<String>>,
        errors: RefCell<Vec<String>>,
        actions: RefCell<Vec<HubspotAction>>,
    }

    impl WidgetHost for RecordingHost {
        fn dispatch(&self, action: HubspotAction) {
            self.actions.borrow_mut().push(action.clone());
            let next = self.state.borrow().clone().apply(action);
            *self.state.borrow_mut() = next;
        }

        fn alert(&self, message: &str) {
            self.alerts.borrow_mut().push(message.to_string());
        }

        fn merge_integration(&self, key: &str, entry: IntegrationEntry) {
            self.params.borrow_mut().merge(key, entry);
            // what the view's params effect does after the parent re-renders
            let params = self.params.borrow().clone();
            sync_connected(self, &params);
        }

        fn log_error(&self, message: &str) {
            self.errors.borrow_mut().push(message.to_string());
        }
    }

    /// Authorize call that never answers, so the flow sits in its first step.
    struct StalledBackend {
        authorize_calls: Cell<u32>,
    }

    #[async_trait(?Send)]
    impl IntegrationBackend for StalledBackend {
        async fn authorize(&self, _user_id: &str, _org_id: &str) -> Result<String, ApiError> {
            self.authorize_calls.set(self.authorize_calls.get() + 1);
            futures::future::pending().await
        }

        async fn credentials(
            &self,
            _user_id: &str,
            _org_id: &str,
        ) -> Result<Option<Credentials>, ApiError> {
            panic!("unexpected credentials call")
        }

        async fn load(&self, _credentials: &Credentials) -> Result<Value, ApiError> {
            panic!("unexpected load call")
        }
    }

    struct SharedPopup(Arc<AtomicBool>);

    impl PopupWindow for SharedPopup {
        fn is_closed(&self) -> bool {
            self.0.load(Ordering::SeqCst)
        }
    }

    /// Marks the popup closed after `open_for` ticks.
    struct ScriptedTicker {
        open_for: u32,
        closed: Arc<AtomicBool>,
        ticks: u32,
    }

    impl ScriptedTicker {
        fn new(open_for: u32, closed: Arc<AtomicBool>) -> Self {
            Self { open_for, closed, ticks: 0 }
        }
    }

    #[async_trait(?Send)]
    impl Ticker for ScriptedTicker {
        async fn tick(&mut self) {
            self.ticks += 1;
            if self.ticks > self.open_for {
                self.closed.store(true, Ordering::SeqCst);
            }
        }
    }

    /// Ticker that never completes, standing in for a popup the user keeps open.
    struct PendingTicker;

    #[async_trait(?Send)]
    impl Ticker for PendingTicker {
        async fn tick(&mut self) {
            futures::future::pending::<()>().await;
        }
    }

    fn launcher_with_popup(closed: Arc<AtomicBool>) -> MockPopupLauncher {
        let mut launcher = MockPopupLauncher::new();
        launcher
            .expect_open()
            .with(eq(AUTH_URL), eq(POPUP_NAME), eq(POPUP_FEATURES))
            .times(1)
            .returning(move |_, _, _| {
                Ok(Some(Box::new(SharedPopup(closed.clone())) as Box<dyn PopupWindow>))
            });
        launcher
    }

    fn creds() -> Credentials {
        Credentials::from_value(json!({"access_token": "abc", "refresh_token": "def"})).unwrap()
    }

    fn connector(backend: FakeBackend) -> HubspotConnector<FakeBackend> {
        HubspotConnector::new(backend, "TestUser", "TestOrg")
    }

    #[test]
    fn reducer_tracks_flags() {
        let state = HubspotState::default()
            .apply(HubspotAction::ConnectStarted);
        assert!(state.is_connecting);

        let state = state.apply(HubspotAction::Connected);
        assert!(state.is_connected);
        assert!(!state.is_connecting);

        let loaded = LoadedItems::from_payload(&json!([{"id": "1", "type": "deals"}])).unwrap();
        let state = state.apply(HubspotAction::ItemsLoaded(loaded.clone()));
        assert_eq!(state.loaded_items, loaded);

        let state = state.apply(HubspotAction::ItemsCleared);
        assert!(state.loaded_items.is_empty());

        let state = state.apply(HubspotAction::ParamsChanged(false));
        assert!(!state.is_connected);
    }

    #[test]
    fn initial_state_follows_params() {
        let params = IntegrationParams::new().merged(HUBSPOT_KEY, IntegrationEntry::hubspot(creds()));
        assert!(HubspotState::from_params(&params).is_connected);
        assert!(!HubspotState::from_params(&IntegrationParams::new()).is_connected);
    }

    #[test]
    fn sync_connected_reflects_credentials_presence() {
        let mut host = MockWidgetHost::new();
        host.expect_dispatch()
            .with(eq(HubspotAction::ParamsChanged(true)))
            .times(1)
            .return_const(());
        host.expect_dispatch()
            .with(eq(HubspotAction::ParamsChanged(false)))
            .times(2)
            .return_const(());

        let connected = IntegrationParams::new().merged(HUBSPOT_KEY, IntegrationEntry::hubspot(creds()));
        let emptied = IntegrationParams::new().merged(
            HUBSPOT_KEY,
            IntegrationEntry {
                credentials: Value::Null,
                integration_type: "HubSpot".to_string(),
            },
        );

        sync_connected(&host, &connected);
        sync_connected(&host, &emptied);
        sync_connected(&host, &IntegrationParams::new());
    }

    #[tokio::test]
    async fn connect_opens_popup_and_exchanges_once_after_close() {
        let closed = Arc::new(AtomicBool::new(false));
        let launcher = launcher_with_popup(closed.clone());
        let mut ticker = ScriptedTicker::new(3, closed);
        let connector = connector(FakeBackend::authorizing().with_credentials(Ok(Some(creds()))));
        let host = RecordingHost::default();
        let (_handle, registration) = AbortHandle::new_pair();

        let outcome = connector.connect(&host, &launcher, &mut ticker, registration).await;

        assert_eq!(outcome, ConnectOutcome::Connected(creds()));
        assert_eq!(ticker.ticks, 4);
        assert_eq!(connector.backend().credentials_calls.get(), 1);
        assert_eq!(host.params.borrow().credentials(HUBSPOT_KEY), Some(creds()));
        assert_eq!(host.params.borrow().get(HUBSPOT_KEY).unwrap().integration_type, "HubSpot");

        let state = host.state.borrow();
        assert!(state.is_connected);
        assert!(!state.is_connecting);
        assert!(host.alerts.borrow().is_empty());
        assert_eq!(host.actions.borrow()[0], HubspotAction::ConnectStarted);
    }

    #[tokio::test]
    async fn falsy_credentials_leave_widget_disconnected() {
        let closed = Arc::new(AtomicBool::new(false));
        let launcher = launcher_with_popup(closed.clone());
        let mut ticker = ScriptedTicker::new(0, closed);
        let connector = connector(FakeBackend::authorizing().with_credentials(Ok(None)));
        let host = RecordingHost::default();
        let (_handle, registration) = AbortHandle::new_pair();

        let outcome = connector.connect(&host, &launcher, &mut ticker, registration).await;

        assert_eq!(outcome, ConnectOutcome::NoCredentials);
        let state = host.state.borrow();
        assert!(!state.is_connected);
        assert!(!state.is_connecting);
        assert!(host.params.borrow().is_empty());
        assert!(host.alerts.borrow().is_empty());
    }

    #[tokio::test]
    async fn authorize_failure_alerts_detail_and_resets() {
        let backend = FakeBackend::default();
        *backend.authorize_result.borrow_mut() = Some(Err(ApiError::Status {
            status: 400,
            detail: Some("Invalid org".to_string()),
        }));
        let connector = connector(backend);
        let mut launcher = MockPopupLauncher::new();
        launcher.expect_open().never();

        let mut host = MockWidgetHost::new();
        let mut seq = mockall::Sequence::new();
        host.expect_dispatch()
            .with(eq(HubspotAction::ConnectStarted))
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        host.expect_dispatch()
            .with(eq(HubspotAction::ConnectFinished))
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        host.expect_alert()
            .withf(|message| message == "Invalid org")
            .times(1)
            .in_sequence(&mut seq)
            .return_const(());
        host.expect_merge_integration().never();

        let (_handle, registration) = AbortHandle::new_pair();
        let outcome = connector
            .connect(&host, &launcher, &mut PendingTicker, registration)
            .await;

        assert_eq!(outcome, ConnectOutcome::Failed);
        assert_eq!(connector.backend().credentials_calls.get(), 0);
    }

    #[tokio::test]
    async fn authorize_failure_without_detail_uses_generic_message() {
        let backend = FakeBackend::default();
        *backend.authorize_result.borrow_mut() = Some(Err(ApiError::Status { status: 502, detail: None }));
        let connector = connector(backend);
        let launcher = MockPopupLauncher::new();
        let host = RecordingHost::default();
        let (_handle, registration) = AbortHandle::new_pair();

        connector
            .connect(&host, &launcher, &mut PendingTicker, registration)
            .await;

        assert_eq!(*host.alerts.borrow(), vec![CONNECT_ERROR.to_string()]);
        assert!(!host.state.borrow().is_connecting);
    }

    #[tokio::test]
    async fn blocked_popup_exchanges_on_first_check() {
        let mut launcher = MockPopupLauncher::new();
        launcher.expect_open().times(1).returning(|_, _, _| Ok(None));
        let closed = Arc::new(AtomicBool::new(false));
        let mut ticker = ScriptedTicker::new(100, closed);
        let connector = connector(FakeBackend::authorizing().with_credentials(Ok(Some(creds()))));
        let host = RecordingHost::default();
        let (_handle, registration) = AbortHandle::new_pair();

        let outcome = connector.connect(&host, &launcher, &mut ticker, registration).await;

        assert_eq!(outcome, ConnectOutcome::Connected(creds()));
        assert_eq!(ticker.ticks, 1);
    }

    #[tokio::test]
    async fn launcher_error_alerts_and_skips_exchange() {
        let mut launcher = MockPopupLauncher::new();
        launcher
            .expect_open()
            .times(1)
            .returning(|_, _, _| Err(PopupError::NoWindow));
        let connector = connector(FakeBackend::authorizing());
        let host = RecordingHost::default();
        let (_handle, registration) = AbortHandle::new_pair();

        let outcome = connector
            .connect(&host, &launcher, &mut PendingTicker, registration)
            .await;

        assert_eq!(outcome, ConnectOutcome::Failed);
        assert_eq!(connector.backend().credentials_calls.get(), 0);
        assert_eq!(*host.alerts.borrow(), vec![CONNECT_ERROR.to_string()]);
    }

    #[tokio::test]
    async fn aborted_poll_never_exchanges() {
        let closed = Arc::new(AtomicBool::new(false));
        let launcher = launcher_with_popup(closed);
        let connector = connector(FakeBackend::authorizing());
        let host = RecordingHost::default();
        let (handle, registration) = AbortHandle::new_pair();
        let mut ticker = PendingTicker;

        let flow = connector.connect(&host, &launcher, &mut ticker, registration);
        let abort = async {
            tokio::task::yield_now().await;
            handle.abort();
        };
        let (outcome, ()) = futures::join!(flow, abort);

        assert_eq!(outcome, ConnectOutcome::Cancelled);
        assert_eq!(connector.backend().credentials_calls.get(), 0);
        assert!(!host.state.borrow().is_connecting);
        assert!(!host.state.borrow().is_connected);
    }

    #[tokio::test]
    async fn abort_during_authorize_never_opens_popup() {
        let connector = HubspotConnector::new(
            StalledBackend { authorize_calls: Cell::new(0) },
            "TestUser",
            "TestOrg",
        );
        let mut launcher = MockPopupLauncher::new();
        launcher.expect_open().never();
        let host = RecordingHost::default();
        let (handle, registration) = AbortHandle::new_pair();
        let mut ticker = PendingTicker;

        let flow = connector.connect(&host, &launcher, &mut ticker, registration);
        let abort = async {
            tokio::task::yield_now().await;
            handle.abort();
        };
        let (outcome, ()) = futures::join!(flow, abort);

        assert_eq!(outcome, ConnectOutcome::Cancelled);
        assert_eq!(connector.backend().authorize_calls.get(), 1);
        assert_eq!(
            *host.actions.borrow(),
            vec![HubspotAction::ConnectStarted, HubspotAction::ConnectFinished]
        );
        assert!(host.alerts.borrow().is_empty());
    }

    #[tokio::test]
    async fn abort_before_start_skips_every_call() {
        let connector = connector(FakeBackend::authorizing());
        let mut launcher = MockPopupLauncher::new();
        launcher.expect_open().never();
        let host = RecordingHost::default();
        let (handle, registration) = AbortHandle::new_pair();
        handle.abort();

        let outcome = connector
            .connect(&host, &launcher, &mut PendingTicker, registration)
            .await;

        assert_eq!(outcome, ConnectOutcome::Cancelled);
        assert_eq!(connector.backend().authorize_calls.get(), 0);
        assert!(!host.state.borrow().is_connecting);
    }

    #[tokio::test]
    async fn credentials_error_alerts_detail() {
        let connector = connector(FakeBackend::default().with_credentials(Err(ApiError::Status {
            status: 400,
            detail: Some("No credentials found.".to_string()),
        })));
        let host = RecordingHost::default();
        host.dispatch(HubspotAction::ConnectStarted);

        let outcome = connector.on_popup_closed(&host).await;

        assert_eq!(outcome, ConnectOutcome::Failed);
        assert_eq!(*host.alerts.borrow(), vec!["No credentials found.".to_string()]);
        assert!(!host.state.borrow().is_connected);
        assert!(!host.state.borrow().is_connecting);
    }

    #[tokio::test]
    async fn load_without_credentials_makes_no_call() {
        let connector = connector(FakeBackend::default());
        let mut host = MockWidgetHost::new();
        host.expect_log_error()
            .withf(|message| message == MISSING_CREDENTIALS)
            .times(1)
            .return_const(());
        host.expect_alert()
            .withf(|message| message == MISSING_CREDENTIALS)
            .times(1)
            .return_const(());
        host.expect_dispatch().never();

        let loaded = connector.load_items(&host, &IntegrationParams::new()).await;

        assert!(loaded.is_none());
        assert!(connector.backend().load_calls.borrow().is_empty());
    }

    #[tokio::test]
    async fn load_renders_pretty_json() {
        let payload = json!([{"id": "1", "type": "contacts", "name": "Ada Lovelace"}]);
        let connector = connector(FakeBackend::default().with_load(Ok(payload.clone())));
        let host = RecordingHost::default();
        let params = IntegrationParams::new().merged(HUBSPOT_KEY, IntegrationEntry::hubspot(creds()));

        let loaded = connector.load_items(&host, &params).await.unwrap();

        assert_eq!(loaded.text, serde_json::to_string_pretty(&payload).unwrap());
        assert_eq!(host.state.borrow().loaded_items, loaded);
        assert_eq!(*connector.backend().load_calls.borrow(), vec![creds()]);
    }

    #[tokio::test]
    async fn load_failure_alerts_with_fallback() {
        let connector = connector(
            FakeBackend::default().with_load(Err(ApiError::Status { status: 500, detail: None })),
        );
        let host = RecordingHost::default();
        let params = IntegrationParams::new().merged(HUBSPOT_KEY, IntegrationEntry::hubspot(creds()));

        assert!(connector.load_items(&host, &params).await.is_none());
        assert_eq!(*host.alerts.borrow(), vec![LOAD_ERROR.to_string()]);
        assert_eq!(
            *host.errors.borrow(),
            vec!["Error loading HubSpot items: Backend returned 500: no detail".to_string()]
        );
        assert!(host.state.borrow().loaded_items.is_empty());
    }

    #[test]
    fn clear_items_only_dispatches() {
        let connector = connector(FakeBackend::default());
        let mut host = MockWidgetHost::new();
        host.expect_dispatch()
            .with(eq(HubspotAction::ItemsCleared))
            .times(1)
            .return_const(());

        clear_items(&host);

        let backend = connector.backend();
        assert_eq!(backend.authorize_calls.get(), 0);
        assert_eq!(backend.credentials_calls.get(), 0);
        assert!(backend.load_calls.borrow().is_empty());
    }
}
