use crate::api::{
    self, bleuuid::BleUuid, CharPropFlags, CharacteristicId, CharacteristicProperties,
    RequestSender, ServiceProperties, ValueNotification,
};
use crate::{Error, Result};
use async_trait::async_trait;
use bluer::adv::{Advertisement, AdvertisementHandle};
use bluer::gatt::local::{
    Application, ApplicationHandle, Characteristic, CharacteristicNotifier, CharacteristicNotify,
    CharacteristicNotifyMethod, CharacteristicRead, CharacteristicReadRequest,
    CharacteristicWrite, CharacteristicWriteMethod, CharacteristicWriteRequest, ReqError, Service,
};
use dashmap::DashMap;
use futures::FutureExt;
use log::{debug, info, trace, warn};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

const NOTIFY_BUFFER: usize = 8;

struct Published {
    // Dropping the handles withdraws the application and the advertisement.
    _application: ApplicationHandle,
    _advertisement: AdvertisementHandle,
}

#[derive(Default)]
struct Registry {
    services: Vec<ServiceProperties>,
    characteristics: Vec<CharacteristicProperties>,
}

/// Implementation of [api::Stack](crate::api::Stack) on top of the BlueZ GATT manager and LE
/// advertising manager.
#[derive(Clone)]
pub struct GattStack {
    adapter: bluer::Adapter,
    registry: Arc<Mutex<Registry>>,
    subscribers: Arc<Subscribers>,
    published: Arc<Mutex<Option<Published>>>,
}

impl fmt::Debug for GattStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GattStack")
            .field("adapter", &self.adapter.name())
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl GattStack {
    pub(crate) fn new(adapter: bluer::Adapter) -> Self {
        Self {
            adapter,
            registry: Arc::new(Mutex::new(Registry::default())),
            subscribers: Arc::new(DashMap::new()),
            published: Arc::new(Mutex::new(None)),
        }
    }

    fn application(&self, requests: &RequestSender) -> Application {
        let registry = self.registry.lock().unwrap();
        let services = registry
            .services
            .iter()
            .map(|service| Service {
                uuid: service.uuid,
                primary: service.primary,
                characteristics: registry
                    .characteristics
                    .iter()
                    .filter(|c| c.service == service.id)
                    .map(|c| self.characteristic(c, requests))
                    .collect(),
                ..Default::default()
            })
            .collect();
        Application {
            services,
            ..Default::default()
        }
    }

    fn characteristic(
        &self,
        properties: &CharacteristicProperties,
        requests: &RequestSender,
    ) -> Characteristic {
        let flags = properties.flags;

        let read = flags.contains(CharPropFlags::READ).then(|| {
            let requests = requests.clone();
            let id = properties.id.clone();
            CharacteristicRead {
                read: true,
                fun: Box::new(move |_request: CharacteristicReadRequest| {
                    let requests = requests.clone();
                    let id = id.clone();
                    async move { requests.read(id).await.map_err(request_error) }.boxed()
                }),
                ..Default::default()
            }
        });

        let write = flags
            .intersects(CharPropFlags::WRITE | CharPropFlags::WRITE_WITHOUT_RESPONSE)
            .then(|| {
                let requests = requests.clone();
                let id = properties.id.clone();
                CharacteristicWrite {
                    write: flags.contains(CharPropFlags::WRITE),
                    write_without_response: flags.contains(CharPropFlags::WRITE_WITHOUT_RESPONSE),
                    method: CharacteristicWriteMethod::Fun(Box::new(
                        move |value: Vec<u8>, _request: CharacteristicWriteRequest| {
                            let requests = requests.clone();
                            let id = id.clone();
                            async move { requests.write(id, value).await.map_err(request_error) }
                                .boxed()
                        },
                    )),
                    ..Default::default()
                }
            });

        let notify = flags
            .intersects(CharPropFlags::NOTIFY | CharPropFlags::INDICATE)
            .then(|| {
                let requests = requests.clone();
                let id = properties.id.clone();
                let subscribers = self.subscribers.clone();
                CharacteristicNotify {
                    notify: flags.contains(CharPropFlags::NOTIFY),
                    indicate: flags.contains(CharPropFlags::INDICATE),
                    method: CharacteristicNotifyMethod::Fun(Box::new(
                        move |notifier: CharacteristicNotifier| {
                            serve_notifications(
                                notifier,
                                id.clone(),
                                requests.clone(),
                                subscribers.clone(),
                            )
                            .boxed()
                        },
                    )),
                    ..Default::default()
                }
            });

        Characteristic {
            uuid: properties.uuid,
            read,
            write,
            notify,
            ..Default::default()
        }
    }
}

type Subscribers = DashMap<CharacteristicId, mpsc::Sender<Vec<u8>>>;

/// Forwards values for one subscribed central until it unsubscribes or the emulator goes away.
async fn serve_notifications(
    mut notifier: CharacteristicNotifier,
    id: CharacteristicId,
    requests: RequestSender,
    subscribers: Arc<Subscribers>,
) {
    let (tx, mut values) = mpsc::channel(NOTIFY_BUFFER);
    // Only the map holds the sender, so removing the entry ends this session.
    let session = tx.downgrade();
    subscribers.insert(id.clone(), tx);
    if let Err(err) = requests.start_notify(id.clone()).await {
        warn!("Could not start notifications on {}: {}", id, err);
        release(&subscribers, &id, &session);
        return;
    }

    loop {
        let value = tokio::select! {
            value = values.recv() => value,
            _ = notifier.stopped() => None,
        };
        let Some(value) = value else { break };
        if let Err(err) = notifier.notify(value).await {
            debug!("Notification session on {} ended: {}", id, err);
            break;
        }
    }

    // A newer session for the same characteristic owns the entry and the notify state.
    if !release(&subscribers, &id, &session) {
        trace!("Session on {} was superseded", id);
        return;
    }
    if let Err(err) = requests.stop_notify(id.clone()).await {
        debug!("Could not stop notifications on {}: {}", id, err);
    }
}

/// Removes the subscription for `id` if it still belongs to `session`. Returns false when the
/// entry is gone or was replaced by a newer session.
fn release(
    subscribers: &Subscribers,
    id: &CharacteristicId,
    session: &mpsc::WeakSender<Vec<u8>>,
) -> bool {
    let Some(own) = session.upgrade() else {
        return false;
    };
    subscribers
        .remove_if(id, |_, tx| tx.same_channel(&own))
        .is_some()
}

fn request_error(error: Error) -> ReqError {
    match error {
        Error::InvalidAccess { .. } => ReqError::NotPermitted,
        Error::CharacteristicNotFound(_) => ReqError::NotSupported,
        _ => ReqError::Failed,
    }
}

#[async_trait]
impl api::Stack for GattStack {
    async fn register_service(&self, service: ServiceProperties) -> Result<()> {
        trace!("Registering service {}", service.id);
        self.registry.lock().unwrap().services.push(service);
        Ok(())
    }

    async fn register_characteristic(
        &self,
        characteristic: CharacteristicProperties,
    ) -> Result<()> {
        trace!("Registering characteristic {}", characteristic.id);
        self.registry
            .lock()
            .unwrap()
            .characteristics
            .push(characteristic);
        Ok(())
    }

    async fn publish(&self, alias: &str, requests: RequestSender) -> Result<()> {
        let application = self.application(&requests);
        let service_uuids: BTreeSet<_> = self
            .registry
            .lock()
            .unwrap()
            .services
            .iter()
            .filter(|service| service.primary)
            .map(|service| service.uuid)
            .collect();

        let application = self
            .adapter
            .serve_gatt_application(application)
            .await
            .map_err(|err| Error::StackUnavailable(err.to_string()))?;
        info!("GATT application registered");

        let advertisement = Advertisement {
            service_uuids: service_uuids.clone(),
            discoverable: Some(true),
            local_name: Some(alias.to_string()),
            ..Default::default()
        };
        let advertisement = self
            .adapter
            .advertise(advertisement)
            .await
            .map_err(|err| Error::StackUnavailable(err.to_string()))?;
        info!(
            "Advertising {:?} with services {:?}",
            alias,
            service_uuids
                .iter()
                .map(|uuid| uuid.to_short_string())
                .collect::<Vec<_>>()
        );

        *self.published.lock().unwrap() = Some(Published {
            _application: application,
            _advertisement: advertisement,
        });
        Ok(())
    }

    async fn notify(&self, notification: ValueNotification) -> Result<()> {
        let sender = self
            .subscribers
            .get(&notification.characteristic)
            .map(|entry| entry.value().clone());
        match sender {
            Some(sender) => {
                if sender.try_send(notification.value).is_err() {
                    debug!(
                        "Dropped notification on {}, subscriber is behind or gone",
                        notification.characteristic
                    );
                }
            }
            None => trace!("No subscriber for {}", notification.characteristic),
        }
        Ok(())
    }

    async fn unpublish(&self) -> Result<()> {
        self.subscribers.clear();
        if self.published.lock().unwrap().take().is_some() {
            info!("GATT application and advertisement withdrawn");
        }
        Ok(())
    }
}
