use std::sync::Arc;

use crate::database::StoreRef;
use crate::services::notification_outbox::NotificationOutbox;
use crate::services::payment_service::PaymentService;

#[derive(Clone)]
pub struct AppState {
    pub store: StoreRef,
    pub payments: PaymentService,
    pub outbox: NotificationOutbox,
    pub jwt_secret: Arc<str>,
}

impl AppState {
    pub fn new(store: StoreRef, jwt_secret: impl Into<Arc<str>>) -> Self {
        let outbox = NotificationOutbox::new(store.clone());
        let payments = PaymentService::new(store.clone(), outbox.clone());

        AppState {
            store,
            payments,
            outbox,
            jwt_secret: jwt_secret.into(),
        }
    }
}
