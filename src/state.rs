// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::config::GatewayConfig;
use crate::credentials::CredentialStore;
use crate::index_page::IndexPage;
use crate::ingress::IngressExchanger;
use crate::session::SessionCodec;
use crate::upstream::IdentityApi;

/// Everything a request handler needs, cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub credentials: CredentialStore,
    pub codec: Arc<SessionCodec>,
    pub exchanger: Arc<IngressExchanger>,
    pub api: Arc<dyn IdentityApi>,
    pub index: Arc<IndexPage>,
}

impl AppState {
    pub fn new(
        config: GatewayConfig,
        api: Arc<dyn IdentityApi>,
        credentials: CredentialStore,
    ) -> Self {
        let codec = SessionCodec::new(&config.cookie_key, config.session_key());
        let exchanger = IngressExchanger::new(Arc::clone(&api), credentials.clone(), config.mode);
        let index = IndexPage::new(
            config.index_html_path.clone(),
            config.enclave_prefix(),
            config.mode.is_production(),
        );

        Self {
            config: Arc::new(config),
            credentials,
            codec: Arc::new(codec),
            exchanger: Arc::new(exchanger),
            api,
            index: Arc::new(index),
        }
    }
}
