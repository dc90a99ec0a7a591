use futures::future::AbortHandle;
use std::rc::Rc;
use wasm_bindgen_futures::spawn_local;
use yew::prelude::*;

use crate::config;
use crate::connections::hubspot::{
    clear_items, sync_connected, HubspotAction, HubspotConnector, HubspotState, WidgetHost,
    CONNECT_ERROR, LOAD_ERROR,
};
use crate::models::integration::{IntegrationEntry, IntegrationParams};
use crate::utils::api::HubspotApi;
use crate::utils::popup::{BrowserLauncher, TimeoutTicker};

#[derive(Properties, PartialEq)]
pub struct HubspotIntegrationProps {
    pub user: String,
    pub org: String,
    pub integration_params: IntegrationParams,
    /// Gets `(key, entry)` once credentials arrive; the parent merges it into
    /// its params and passes them back down.
    pub on_merge: Callback<(String, IntegrationEntry)>,
}

impl Reducible for HubspotState {
    type Action = HubspotAction;

    fn reduce(self: Rc<Self>, action: Self::Action) -> Rc<Self> {
        Rc::new((*self).clone().apply(action))
    }
}

struct ViewHost {
    dispatcher: UseReducerDispatcher<HubspotState>,
    on_merge: Callback<(String, IntegrationEntry)>,
}

impl WidgetHost for ViewHost {
    fn dispatch(&self, action: HubspotAction) {
        self.dispatcher.dispatch(action);
    }

    fn alert(&self, message: &str) {
        if let Some(window) = web_sys::window() {
            let _ = window.alert_with_message(message);
        }
    }

    fn merge_integration(&self, key: &str, entry: IntegrationEntry) {
        self.on_merge.emit((key.to_string(), entry));
    }

    fn log_error(&self, message: &str) {
        gloo_console::error!(message.to_string());
    }
}

fn build_connector(user: &str, org: &str) -> Option<HubspotConnector<HubspotApi>> {
    match HubspotApi::new(&config::get_backend_url()) {
        Ok(api) => Some(HubspotConnector::new(api, user, org)),
        Err(e) => {
            gloo_console::error!(format!("Invalid backend URL: {}", e));
            None
        }
    }
}

#[function_component(HubspotIntegration)]
pub fn hubspot_integration(props: &HubspotIntegrationProps) -> Html {
    let state = {
        let params = props.integration_params.clone();
        use_reducer(move || HubspotState::from_params(&params))
    };
    let poll_abort = use_mut_ref(|| None::<AbortHandle>);

    // Stop a pending popup poll when the widget unmounts
    {
        let poll_abort = poll_abort.clone();
        use_effect_with_deps(
            move |_| {
                move || {
                    if let Some(handle) = poll_abort.borrow_mut().take() {
                        handle.abort();
                    }
                }
            },
            (),
        );
    }

    {
        let dispatcher = state.dispatcher();
        let on_merge = props.on_merge.clone();
        use_effect_with_deps(
            move |params: &IntegrationParams| {
                sync_connected(&ViewHost { dispatcher, on_merge }, params);
                || ()
            },
            props.integration_params.clone(),
        );
    }

    let onclick_connect = {
        let dispatcher = state.dispatcher();
        let on_merge = props.on_merge.clone();
        let poll_abort = poll_abort.clone();
        let user = props.user.clone();
        let org = props.org.clone();
        Callback::from(move |_: MouseEvent| {
            let host = ViewHost {
                dispatcher: dispatcher.clone(),
                on_merge: on_merge.clone(),
            };
            let Some(connector) = build_connector(&user, &org) else {
                host.alert(CONNECT_ERROR);
                return;
            };
            let (handle, registration) = AbortHandle::new_pair();
            if let Some(previous) = poll_abort.borrow_mut().replace(handle) {
                previous.abort();
            }
            spawn_local(async move {
                let mut ticker = TimeoutTicker::new(config::DEFAULT_POLL_INTERVAL);
                connector
                    .connect(&host, &BrowserLauncher, &mut ticker, registration)
                    .await;
            });
        })
    };

    let onclick_load = {
        let dispatcher = state.dispatcher();
        let on_merge = props.on_merge.clone();
        let params = props.integration_params.clone();
        let user = props.user.clone();
        let org = props.org.clone();
        Callback::from(move |_: MouseEvent| {
            let host = ViewHost {
                dispatcher: dispatcher.clone(),
                on_merge: on_merge.clone(),
            };
            let params = params.clone();
            let Some(connector) = build_connector(&user, &org) else {
                host.alert(LOAD_ERROR);
                return;
            };
            spawn_local(async move {
                connector.load_items(&host, &params).await;
            });
        })
    };

    let onclick_clear = {
        let dispatcher = state.dispatcher();
        let on_merge = props.on_merge.clone();
        Callback::from(move |_: MouseEvent| {
            clear_items(&ViewHost {
                dispatcher: dispatcher.clone(),
                on_merge: on_merge.clone(),
            });
        })
    };

    html! {
        <div class="service-item hubspot-integration">
            <h3>{"HubSpot Integration"}</h3>
            if !state.is_connected {
                <button
                    onclick={onclick_connect}
                    class="connect-button"
                    disabled={state.is_connecting}
                >
                    if state.is_connecting {
                        {"Connecting..."}
                    } else {
                        {"Connect to HubSpot"}
                    }
                </button>
            } else {
                <div>
                    <p class="service-status">{"HubSpot Connected!"}</p>
                    <button onclick={onclick_load} class="test-button">
                        {"Load HubSpot Items"}
                    </button>
                    <button onclick={onclick_clear} class="disconnect-button">
                        {"Clear Data"}
                    </button>
                    if !state.loaded_items.counts.is_empty() {
                        <p class="items-summary">{state.loaded_items.summary()}</p>
                    }
                    <label for="hubspot-loaded-data">{"Loaded Data"}</label>
                    <textarea
                        id="hubspot-loaded-data"
                        class="loaded-data"
                        rows="10"
                        readonly={true}
                        value={state.loaded_items.text.clone()}
                    />
                </div>
            }
        </div>
    }
}
