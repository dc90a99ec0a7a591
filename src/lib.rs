pub mod config;
pub mod models {
    pub mod integration;
}
pub mod utils {
    pub mod api;
    pub mod popup;
}
pub mod connections {
    pub mod hubspot;
    #[cfg(target_arch = "wasm32")]
    pub mod hubspot_view;
}

pub use config::Config;
pub use connections::hubspot::{
    clear_items, sync_connected, ConnectOutcome, HubspotAction, HubspotConnector, HubspotState, WidgetHost,
};
pub use models::integration::{
    Credentials, IntegrationEntry, IntegrationItem, IntegrationParams, LoadedItems,
};
pub use utils::api::{ApiError, HubspotApi, IntegrationBackend};
pub use utils::popup::{PopupError, PopupLauncher, PopupWindow, Ticker};
#[cfg(target_arch = "wasm32")]
pub use connections::hubspot_view::{HubspotIntegration, HubspotIntegrationProps};
