//! Shared test doubles and builders for integration tests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Mutex;

use brewlink::channel::receipt::{ReceiptChannel, ReceiptChannelFactory};
use brewlink::core::AppResult;
use brewlink::core::config::{ReceiptConfig, SessionConfig};
use brewlink::core::error::AppError;
use brewlink::core::events::ReceiptStatusEvent;
use brewlink::core::types::{CafeId, ChannelKey, ReceiptId};
use brewlink::receipt::api::{ReceiptApi, ReceiptInit};
use brewlink::receipt::image::CapturedImage;
use brewlink::receipt::machine::{ReceiptSubmissionMachine, SubmitMode};
use brewlink::session::shared::SharedSessionState;
use brewlink::session::store::SessionStore;

pub const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1A, b'\n'];

/// A small valid-looking PNG payload.
pub fn png_image() -> CapturedImage {
    let mut data = PNG_MAGIC.to_vec();
    data.resize(256, 0);
    CapturedImage::from_file(Bytes::from(data), 10 * 1024 * 1024).unwrap()
}

/// Scripted REST collaborator.
///
/// Records the order of calls and can fail any step. Optionally probes a
/// session store at `initialize` time so tests can assert that a
/// replaced session was cleared before the first network call.
pub struct ScriptedApi {
    pub calls: std::sync::Mutex<Vec<String>>,
    pub fail_initialize: Option<String>,
    pub fail_upload: std::sync::Mutex<Option<String>>,
    pub store_probe: std::sync::Mutex<Option<Arc<SessionStore>>>,
    pub record_present_at_init: std::sync::Mutex<Option<bool>>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self {
            calls: std::sync::Mutex::new(Vec::new()),
            fail_initialize: None,
            fail_upload: std::sync::Mutex::new(None),
            store_probe: std::sync::Mutex::new(None),
            record_present_at_init: std::sync::Mutex::new(None),
        }
    }

    pub fn call_log(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReceiptApi for ScriptedApi {
    async fn initialize(
        &self,
        _cafe_id: CafeId,
        _latitude: f64,
        _longitude: f64,
    ) -> AppResult<ReceiptInit> {
        self.calls.lock().unwrap().push("initialize".to_string());

        let probe = self.store_probe.lock().unwrap().clone();
        if let Some(store) = probe {
            let present = store.load().await.is_some();
            *self.record_present_at_init.lock().unwrap() = Some(present);
        }

        if let Some(message) = &self.fail_initialize {
            return Err(AppError::external_service(message.clone()));
        }

        Ok(ReceiptInit {
            receipt_id: ReceiptId::new("r-1"),
            channel_key: ChannelKey::new("k"),
            upload_url: "https://uploads.example/r-1".to_string(),
            bucket: "receipts".to_string(),
            object_key: "r-1.png".to_string(),
        })
    }

    async fn upload(&self, _upload_url: &str, _content_type: &str, _body: Bytes) -> AppResult<()> {
        self.calls.lock().unwrap().push("upload".to_string());
        if let Some(message) = self.fail_upload.lock().unwrap().clone() {
            return Err(AppError::external_service(message));
        }
        Ok(())
    }

    async fn complete(
        &self,
        _receipt_id: &ReceiptId,
        _bucket: &str,
        _object_key: &str,
    ) -> AppResult<()> {
        self.calls.lock().unwrap().push("complete".to_string());
        Ok(())
    }
}

/// Scripted receipt channel delivering a fixed event sequence.
pub struct ScriptedChannel {
    events: Arc<Mutex<VecDeque<ReceiptStatusEvent>>>,
    stops: Arc<AtomicUsize>,
    joined: Arc<std::sync::Mutex<Vec<ChannelKey>>>,
    fail_connect: bool,
    hang_when_empty: bool,
}

#[async_trait]
impl ReceiptChannel for ScriptedChannel {
    async fn connect(&mut self) -> AppResult<()> {
        if self.fail_connect {
            return Err(AppError::channel("scripted connect failure"));
        }
        Ok(())
    }

    async fn join(&mut self, channel_key: &ChannelKey) -> AppResult<()> {
        self.joined.lock().unwrap().push(channel_key.clone());
        Ok(())
    }

    async fn next_event(&mut self) -> Option<ReceiptStatusEvent> {
        let next = self.events.lock().await.pop_front();
        match next {
            Some(event) => Some(event),
            None if self.hang_when_empty => futures::future::pending().await,
            None => None,
        }
    }

    async fn stop(&mut self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

/// Factory producing [`ScriptedChannel`]s and exposing their counters.
pub struct ScriptedChannelFactory {
    pub events: Arc<Mutex<VecDeque<ReceiptStatusEvent>>>,
    pub stops: Arc<AtomicUsize>,
    pub joined: Arc<std::sync::Mutex<Vec<ChannelKey>>>,
    pub opened: Arc<AtomicUsize>,
    pub fail_connect: bool,
    pub hang_when_empty: bool,
}

impl ScriptedChannelFactory {
    pub fn with_events(events: Vec<ReceiptStatusEvent>) -> Self {
        Self {
            events: Arc::new(Mutex::new(events.into())),
            stops: Arc::new(AtomicUsize::new(0)),
            joined: Arc::new(std::sync::Mutex::new(Vec::new())),
            opened: Arc::new(AtomicUsize::new(0)),
            fail_connect: false,
            hang_when_empty: true,
        }
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn open_count(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

impl ReceiptChannelFactory for ScriptedChannelFactory {
    fn open(&self) -> Box<dyn ReceiptChannel> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Box::new(ScriptedChannel {
            events: self.events.clone(),
            stops: self.stops.clone(),
            joined: self.joined.clone(),
            fail_connect: self.fail_connect,
            hang_when_empty: self.hang_when_empty,
        })
    }
}

/// Everything a machine test needs, wired against doubles.
pub struct TestRig {
    pub machine: ReceiptSubmissionMachine,
    pub api: Arc<ScriptedApi>,
    pub channels: Arc<ScriptedChannelFactory>,
    pub store: Arc<SessionStore>,
    pub shared: SharedSessionState,
    _dir: tempfile::TempDir,
}

impl TestRig {
    pub fn new(api: ScriptedApi, channels: ScriptedChannelFactory, mode: SubmitMode) -> Self {
        Self::with_timeout(api, channels, mode, 5)
    }

    pub fn with_timeout(
        api: ScriptedApi,
        channels: ScriptedChannelFactory,
        mode: SubmitMode,
        processing_timeout_seconds: u64,
    ) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SessionStore::with_path(dir.path().join("session.json")));
        let shared = SharedSessionState::new();
        let api = Arc::new(api);
        let channels = Arc::new(channels);

        let receipt_config = ReceiptConfig {
            processing_timeout_seconds,
            ..ReceiptConfig::default()
        };

        let machine = ReceiptSubmissionMachine::new(
            api.clone(),
            channels.clone(),
            store.clone(),
            shared.clone(),
            SessionConfig::default(),
            receipt_config,
            CafeId(7),
            mode,
        );

        Self {
            machine,
            api,
            channels,
            store,
            shared,
            _dir: dir,
        }
    }
}
