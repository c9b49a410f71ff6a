//! Test doubles shared by the integration tests.
#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use axum::http::{HeaderMap, StatusCode};
use smart_erp::api_types::{
    Numeric, PatternDetail, PatternNumber, PatternPart, PlanningBatch, PlanningRecord,
    PlanningRecordUpdate, SleeveRow,
};
use smart_erp::application::backend::{BackendError, PlanningBackend};
use smart_erp::gateway::{
    CacheGateway, CacheStorage, FetchError, Fetcher, GatewayConfig, GatewayRequest,
    GatewayResponse, MemoryCacheStorage,
};
use tokio::sync::Semaphore;
use url::Url;

pub const ORIGIN: &str = "http://erp.local/";

/// Origin double: answers every path with `body of {path}` unless scripted
/// otherwise, and can go offline or hold requests until released.
pub struct ScriptedFetcher {
    offline: AtomicBool,
    gated: AtomicBool,
    gate: Semaphore,
    bodies: Mutex<HashMap<String, String>>,
    statuses: Mutex<HashMap<String, StatusCode>>,
    calls: AtomicUsize,
    requested: Mutex<Vec<Url>>,
}

impl ScriptedFetcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            offline: AtomicBool::new(false),
            gated: AtomicBool::new(false),
            gate: Semaphore::new(0),
            bodies: Mutex::new(HashMap::new()),
            statuses: Mutex::new(HashMap::new()),
            calls: AtomicUsize::new(0),
            requested: Mutex::new(Vec::new()),
        })
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn set_body(&self, path: &str, body: &str) {
        self.bodies
            .lock()
            .expect("bodies lock")
            .insert(path.to_string(), body.to_string());
    }

    pub fn set_status(&self, path: &str, status: StatusCode) {
        self.statuses
            .lock()
            .expect("statuses lock")
            .insert(path.to_string(), status);
    }

    /// Hold every following fetch until [`Self::release`] hands out permits.
    pub fn hold(&self) {
        self.gated.store(true, Ordering::SeqCst);
    }

    pub fn release(&self, permits: usize) {
        self.gate.add_permits(permits);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every URL fetched so far, in order.
    pub fn requested(&self) -> Vec<Url> {
        self.requested.lock().expect("requested lock").clone()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, request: &GatewayRequest) -> Result<GatewayResponse, FetchError> {
        if self.gated.load(Ordering::SeqCst) {
            let permit = self
                .gate
                .acquire()
                .await
                .map_err(|err| FetchError::new(request.url.as_str(), err.to_string()))?;
            permit.forget();
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requested
            .lock()
            .expect("requested lock")
            .push(request.url.clone());

        if self.offline.load(Ordering::SeqCst) {
            return Err(FetchError::new(request.url.as_str(), "network unreachable"));
        }

        let path = request.path().to_string();
        let status = self
            .statuses
            .lock()
            .expect("statuses lock")
            .get(&path)
            .copied()
            .unwrap_or(StatusCode::OK);
        let body = self
            .bodies
            .lock()
            .expect("bodies lock")
            .get(&path)
            .cloned()
            .unwrap_or_else(|| format!("body of {path}"));
        Ok(GatewayResponse::new(status, HeaderMap::new(), body))
    }
}

pub fn url(path: &str) -> Url {
    Url::parse(ORIGIN)
        .and_then(|origin| origin.join(path))
        .expect("valid url")
}

pub fn gateway_with(
    storage: MemoryCacheStorage,
    fetcher: Arc<ScriptedFetcher>,
) -> CacheGateway {
    CacheGateway::new(
        Url::parse(ORIGIN).expect("origin"),
        GatewayConfig::default(),
        Arc::new(storage) as Arc<dyn CacheStorage>,
        fetcher,
    )
}

/// A gateway that has installed the shell and taken control.
pub async fn active_gateway(
    storage: MemoryCacheStorage,
    fetcher: Arc<ScriptedFetcher>,
) -> CacheGateway {
    let gateway = gateway_with(storage, fetcher);
    gateway.install().await.expect("install");
    gateway.activate().await.expect("activate");
    gateway
}

/// In-memory ERP backend.
#[derive(Default)]
pub struct FakeBackend {
    pub patterns: Vec<PatternNumber>,
    pub parts: HashMap<i64, Vec<PatternPart>>,
    pub details: HashMap<i64, PatternDetail>,
    pub records: Mutex<Vec<PlanningRecord>>,
    pub submitted: Mutex<Vec<PlanningBatch>>,
    pub updates: Mutex<Vec<(i64, PlanningRecordUpdate)>>,
    pub fail_submit: AtomicBool,
    pub fail_list_entries: AtomicBool,
    pub fail_detail: AtomicBool,
    /// Held submits wait here until permits are released.
    pub submit_gate: Option<Semaphore>,
}

fn server_error() -> BackendError {
    BackendError::Status {
        status: 500,
        body: "internal error".into(),
    }
}

#[async_trait]
impl PlanningBackend for FakeBackend {
    async fn list_patterns(&self) -> Result<Vec<PatternNumber>, BackendError> {
        Ok(self.patterns.clone())
    }

    async fn parts_by_pattern(&self, pattern_id: i64) -> Result<Vec<PatternPart>, BackendError> {
        Ok(self.parts.get(&pattern_id).cloned().unwrap_or_default())
    }

    async fn pattern_detail(&self, pattern_id: i64) -> Result<PatternDetail, BackendError> {
        if self.fail_detail.load(Ordering::SeqCst) {
            return Err(server_error());
        }
        self.details
            .get(&pattern_id)
            .cloned()
            .ok_or(BackendError::Status {
                status: 404,
                body: "pattern not found".into(),
            })
    }

    async fn list_entries(&self) -> Result<Vec<PlanningRecord>, BackendError> {
        if self.fail_list_entries.load(Ordering::SeqCst) {
            return Err(server_error());
        }
        Ok(self.records.lock().expect("records lock").clone())
    }

    async fn create_entries(&self, batch: &PlanningBatch) -> Result<(), BackendError> {
        if let Some(gate) = &self.submit_gate {
            gate.acquire()
                .await
                .map_err(|err| BackendError::transport("planning-entry", err))?
                .forget();
        }
        if self.fail_submit.load(Ordering::SeqCst) {
            return Err(server_error());
        }

        let mut records = self.records.lock().expect("records lock");
        for entry in &batch.entries {
            let id = records.len() as i64 + 1;
            records.push(record(id, &entry.plan_date, entry.shift, &entry.mould_box_size));
        }
        self.submitted
            .lock()
            .expect("submitted lock")
            .push(batch.clone());
        Ok(())
    }

    async fn update_entry(
        &self,
        id: i64,
        update: &PlanningRecordUpdate,
    ) -> Result<(), BackendError> {
        let mut records = self.records.lock().expect("records lock");
        let record = records
            .iter_mut()
            .find(|record| record.id == id)
            .ok_or(BackendError::Status {
                status: 404,
                body: "no such entry".into(),
            })?;
        if let Some(shift) = update.shift {
            record.shift = Numeric::Int(i64::from(shift));
        }
        if let Some(size) = &update.mould_box_size {
            record.mould_box_size = Some(size.clone());
        }
        self.updates
            .lock()
            .expect("updates lock")
            .push((id, update.clone()));
        Ok(())
    }

    async fn delete_entry(&self, id: i64) -> Result<(), BackendError> {
        let mut records = self.records.lock().expect("records lock");
        let before = records.len();
        records.retain(|record| record.id != id);
        if records.len() == before {
            return Err(BackendError::Status {
                status: 404,
                body: "no such entry".into(),
            });
        }
        Ok(())
    }
}

pub fn record(id: i64, plan_date: &str, shift: u8, box_size: &str) -> PlanningRecord {
    PlanningRecord {
        id,
        plan_date: plan_date.to_string(),
        shift: Numeric::Int(i64::from(shift)),
        pattern_id: None,
        pattern_no: Some(format!("PT-{id}")),
        customer_name: None,
        mould_box_size: (!box_size.is_empty()).then(|| box_size.to_string()),
        plate_qty: None,
        production_qty: None,
        total_weight: None,
        no_of_heats: None,
        core_type: None,
        sleeve: None,
    }
}

pub fn part(part_row_id: i64, qty: Numeric, weight: Numeric) -> PatternPart {
    PatternPart {
        part_row_id,
        part_no: Some(format!("P-{part_row_id}")),
        internal_part_no: None,
        part_name: Some(format!("Part {part_row_id}")),
        qty: Some(qty),
        weight: Some(weight),
    }
}

/// Backend with pattern 7 (two parts, 10 boxes per heat, shell cores and
/// one sleeve size) and pattern 8 (no detail figures).
pub fn foundry_backend() -> FakeBackend {
    let mut backend = FakeBackend {
        patterns: vec![
            PatternNumber {
                pattern_id: 7,
                pattern_no: "PT-7".into(),
                customer_name: Some("Acme Castings".into()),
            },
            PatternNumber {
                pattern_id: 8,
                pattern_no: "PT-8".into(),
                customer_name: None,
            },
        ],
        ..FakeBackend::default()
    };
    backend.parts.insert(
        7,
        vec![
            part(71, Numeric::Int(2), Numeric::Text("1.5".into())),
            part(72, Numeric::Text("0".into()), Numeric::Float(4.0)),
        ],
    );
    backend.parts.insert(
        8,
        vec![part(81, Numeric::Text("abc".into()), Numeric::Text("n/a".into()))],
    );
    backend.details.insert(
        7,
        PatternDetail {
            pattern_id: Some(7),
            pattern_no: Some("PT-7".into()),
            box_per_heat: Some(Numeric::Int(10)),
            moulding_box_size: Some("600x500".into()),
            shell_core_qty: Some(Numeric::Int(2)),
            sleeve_rows: vec![SleeveRow {
                sleeve_size: Some("S-40".into()),
                quantity: Some(Numeric::Int(3)),
            }],
            ..PatternDetail::default()
        },
    );
    backend.details.insert(8, PatternDetail::default());
    backend
}
