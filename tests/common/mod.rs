// Mock ERP and record-store servers for integration tests.
// The ERP mock speaks JSON-RPC with an in-memory model store; the record
// store mock serves get/list/create/patch over the REST paths.
#![allow(dead_code)]

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Once};
use std::time::Duration;
use tokio::sync::RwLock;

use freight_erp_sync::config::{
    AppConfig, RecordSchema, RecordStoreConfig, RecordTables, ServiceProducts, SyncOptions,
    TenantConfig,
};
use freight_erp_sync::models::record::Record;
use freight_erp_sync::models::tenant::{PerTenant, TenantCode};
use freight_erp_sync::services::{AirtableClient, SyncContext};

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "freight_erp_sync=debug".into()),
            )
            .with_test_writer()
            .try_init()
            .ok();
    });
}

// ============================================================================
// Mock ERP (JSON-RPC)
// ============================================================================

#[derive(Debug, Clone)]
pub struct ErpCall {
    pub model: String,
    pub method: String,
    pub args: Value,
    pub kwargs: Value,
}

#[derive(Debug)]
pub struct MockErpState {
    pub password: String,
    pub uid: i64,
    pub models: HashMap<String, Vec<Map<String, Value>>>,
    pub next_id: i64,
    pub calls: Vec<ErpCall>,
    pub logins: usize,
    /// Models whose `create` answers with a server fault.
    pub failing_creates: HashSet<String>,
    /// Methods that answer with a server fault on every model.
    pub failing_methods: HashSet<String>,
}

impl MockErpState {
    fn new(password: &str) -> Self {
        Self {
            password: password.to_string(),
            uid: 7,
            models: HashMap::new(),
            next_id: 100,
            calls: Vec::new(),
            logins: 0,
            failing_creates: HashSet::new(),
            failing_methods: HashSet::new(),
        }
    }

    pub fn seed(&mut self, model: &str, row: Value) -> i64 {
        let mut row = row.as_object().cloned().unwrap_or_default();
        let id = match row.get("id").and_then(Value::as_i64) {
            Some(id) => id,
            None => {
                self.next_id += 1;
                row.insert("id".to_string(), json!(self.next_id));
                self.next_id
            }
        };
        self.models.entry(model.to_string()).or_default().push(row);
        id
    }

    pub fn rows(&self, model: &str) -> Vec<Map<String, Value>> {
        self.models.get(model).cloned().unwrap_or_default()
    }

    pub fn calls_to(&self, model: &str, method: &str) -> Vec<ErpCall> {
        self.calls
            .iter()
            .filter(|c| c.model == model && c.method == method)
            .cloned()
            .collect()
    }

    fn execute(&mut self, model: &str, method: &str, args: &Value, kwargs: &Value) -> Result<Value, String> {
        if self.failing_methods.contains(method) {
            return Err(format!("{} refused on {}", method, model));
        }
        match method {
            "search_read" => {
                let domain = args.get(0).cloned().unwrap_or_else(|| json!([]));
                let limit = kwargs.get("limit").and_then(Value::as_u64).unwrap_or(0) as usize;
                let mut rows: Vec<Value> = self
                    .rows(model)
                    .into_iter()
                    .filter(|row| domain_matches(row, &domain))
                    .map(Value::Object)
                    .collect();
                if limit > 0 {
                    rows.truncate(limit);
                }
                Ok(Value::Array(rows))
            }
            "create" => {
                if self.failing_creates.contains(model) {
                    return Err(format!("create not allowed on {}", model));
                }
                let mut payload = args.get(0).cloned().unwrap_or_else(|| json!({}));
                if model == "account.move" {
                    payload["amount_total"] = json!(move_total(&payload));
                    payload["name"] = json!("/");
                    payload["state"] = json!("draft");
                }
                Ok(json!(self.seed(model, payload)))
            }
            "write" => {
                let ids: Vec<i64> = args
                    .get(0)
                    .and_then(Value::as_array)
                    .map(|ids| ids.iter().filter_map(Value::as_i64).collect())
                    .unwrap_or_default();
                let values = args.get(1).and_then(Value::as_object).cloned().unwrap_or_default();
                for row in self.models.entry(model.to_string()).or_default() {
                    if row.get("id").and_then(Value::as_i64).map_or(false, |id| ids.contains(&id)) {
                        for (k, v) in &values {
                            row.insert(k.clone(), v.clone());
                        }
                    }
                }
                Ok(json!(true))
            }
            "action_post" => {
                let ids: Vec<i64> = args
                    .get(0)
                    .and_then(Value::as_array)
                    .map(|ids| ids.iter().filter_map(Value::as_i64).collect())
                    .unwrap_or_default();
                for row in self.models.entry(model.to_string()).or_default() {
                    if let Some(id) = row.get("id").and_then(Value::as_i64).filter(|id| ids.contains(id)) {
                        row.insert("state".to_string(), json!("posted"));
                        row.insert("name".to_string(), json!(format!("FAC/{:04}", id)));
                    }
                }
                Ok(json!(true))
            }
            other => Err(format!("method {} not supported", other)),
        }
    }
}

fn move_total(payload: &Value) -> f64 {
    payload
        .get("invoice_line_ids")
        .and_then(Value::as_array)
        .map(|lines| {
            lines
                .iter()
                .filter_map(|cmd| cmd.get(2))
                .map(|line| {
                    let qty = line.get("quantity").and_then(Value::as_f64).unwrap_or(1.0);
                    let price = line.get("price_unit").and_then(Value::as_f64).unwrap_or(0.0);
                    qty * price
                })
                .sum()
        })
        .unwrap_or(0.0)
}

/// Conjunction of `[field, op, value]` terms; `=` and `ilike` only.
fn domain_matches(row: &Map<String, Value>, domain: &Value) -> bool {
    let Some(terms) = domain.as_array() else {
        return true;
    };
    terms.iter().all(|term| match term.as_array().map(Vec::as_slice) {
        Some([field, op, expected]) => {
            let actual = field.as_str().and_then(|f| row.get(f)).unwrap_or(&Value::Null);
            match op.as_str() {
                Some("=") => values_equal(actual, expected),
                Some("ilike") => match (actual.as_str(), expected.as_str()) {
                    (Some(a), Some(e)) => a.to_lowercase().contains(&e.to_lowercase()),
                    _ => false,
                },
                _ => false,
            }
        }
        _ => true,
    })
}

fn values_equal(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => actual == expected,
    }
}

pub type SharedErp = Arc<RwLock<MockErpState>>;

async fn jsonrpc(State(state): State<SharedErp>, Json(body): Json<Value>) -> Json<Value> {
    let id = body.get("id").cloned().unwrap_or(Value::Null);
    let params = body.get("params").cloned().unwrap_or_default();
    let service = params.get("service").and_then(Value::as_str).unwrap_or_default();
    let method = params.get("method").and_then(Value::as_str).unwrap_or_default();
    let args = params.get("args").cloned().unwrap_or_else(|| json!([]));

    let mut state = state.write().await;

    let outcome = match (service, method) {
        ("common", "login") => {
            state.logins += 1;
            let ok = args.get(2).and_then(Value::as_str) == Some(state.password.as_str());
            Ok(if ok { json!(state.uid) } else { json!(false) })
        }
        ("object", "execute_kw") => {
            let password_ok = args.get(2).and_then(Value::as_str) == Some(state.password.as_str());
            let model = args.get(3).and_then(Value::as_str).unwrap_or_default().to_string();
            let method = args.get(4).and_then(Value::as_str).unwrap_or_default().to_string();
            let margs = args.get(5).cloned().unwrap_or_else(|| json!([]));
            let kwargs = args.get(6).cloned().unwrap_or_else(|| json!({}));
            state.calls.push(ErpCall {
                model: model.clone(),
                method: method.clone(),
                args: margs.clone(),
                kwargs: kwargs.clone(),
            });
            if password_ok {
                state.execute(&model, &method, &margs, &kwargs)
            } else {
                Err("Access Denied".to_string())
            }
        }
        _ => Err(format!("unknown service {}.{}", service, method)),
    };

    Json(match outcome {
        Ok(result) => json!({"jsonrpc": "2.0", "id": id, "result": result}),
        Err(message) => json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": {"code": 200, "message": "Odoo Server Error", "data": {"message": message}}
        }),
    })
}

pub fn create_erp_mock_server(state: SharedErp) -> Router {
    Router::new().route("/jsonrpc", post(jsonrpc)).with_state(state)
}

// ============================================================================
// Mock record store (REST)
// ============================================================================

#[derive(Debug, Default)]
pub struct MockRecordStoreState {
    pub tables: HashMap<String, Vec<Record>>,
    pub page_size: usize,
    pub fail_patches: bool,
    pub patches: Vec<(String, String, Map<String, Value>)>,
    pub next_id: usize,
}

impl MockRecordStoreState {
    pub fn insert(&mut self, table: &str, id: &str, fields: Value) {
        self.tables.entry(table.to_string()).or_default().push(Record {
            id: id.to_string(),
            fields: fields.as_object().cloned().unwrap_or_default(),
            created_time: Some("2024-01-15T10:00:00.000Z".to_string()),
        });
    }

    pub fn get(&self, table: &str, id: &str) -> Option<&Record> {
        self.tables.get(table)?.iter().find(|r| r.id == id)
    }

    pub fn field(&self, table: &str, id: &str, field: &str) -> Option<Value> {
        self.get(table, id)?.fields.get(field).cloned()
    }
}

pub type SharedRecords = Arc<RwLock<MockRecordStoreState>>;

async fn get_record(
    State(state): State<SharedRecords>,
    Path((_base, table, id)): Path<(String, String, String)>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let state = state.read().await;
    state
        .get(&table, &id)
        .map(|r| Json(json!(r)))
        .ok_or_else(|| (StatusCode::NOT_FOUND, Json(json!({"error": "NOT_FOUND"}))))
}

async fn patch_record(
    State(state): State<SharedRecords>,
    Path((_base, table, id)): Path<(String, String, String)>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let mut state = state.write().await;
    if state.fail_patches {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"error": {"type": "UNKNOWN_FIELD_NAME"}})),
        ));
    }
    let fields = body.get("fields").and_then(Value::as_object).cloned().unwrap_or_default();
    state.patches.push((table.clone(), id.clone(), fields.clone()));

    let record = state
        .tables
        .get_mut(&table)
        .and_then(|rows| rows.iter_mut().find(|r| r.id == id))
        .ok_or_else(|| (StatusCode::NOT_FOUND, Json(json!({"error": "NOT_FOUND"}))))?;
    for (k, v) in fields {
        record.fields.insert(k, v);
    }
    Ok(Json(json!(record)))
}

async fn list_records(
    State(state): State<SharedRecords>,
    Path((_base, table)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    let state = state.read().await;
    let rows = state.tables.get(&table).cloned().unwrap_or_default();
    let start: usize = query.get("offset").and_then(|o| o.parse().ok()).unwrap_or(0);
    let size = if state.page_size == 0 { rows.len().max(1) } else { state.page_size };
    let end = (start + size).min(rows.len());
    let page: Vec<Record> = rows.get(start..end).map(<[Record]>::to_vec).unwrap_or_default();

    if end < rows.len() {
        Json(json!({"records": page, "offset": end.to_string()}))
    } else {
        Json(json!({"records": page}))
    }
}

async fn create_record(
    State(state): State<SharedRecords>,
    Path((_base, table)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let mut state = state.write().await;
    state.next_id += 1;
    let id = format!("recNew{}", state.next_id);
    let fields = body.get("fields").cloned().unwrap_or_else(|| json!({}));
    state.insert(&table, &id, fields);
    Json(json!(state.get(&table, &id)))
}

pub fn create_record_store_mock_server(state: SharedRecords) -> Router {
    Router::new()
        .route("/v0/:base/:table", get(list_records).post(create_record))
        .route("/v0/:base/:table/:id", get(get_record).patch(patch_record))
        .with_state(state)
}

// ============================================================================
// Test Helper Functions
// ============================================================================

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

pub struct TestEnv {
    pub ar: SharedErp,
    pub cl: SharedErp,
    pub records: SharedRecords,
    pub config: AppConfig,
}

impl TestEnv {
    pub fn erp(&self, tenant: TenantCode) -> &SharedErp {
        match tenant {
            TenantCode::Ar => &self.ar,
            TenantCode::Cl => &self.cl,
        }
    }

    pub fn context(&self) -> SyncContext {
        let config = Arc::new(self.config.clone());
        let record_store = AirtableClient::new(&config.record_store, config.http_timeout).unwrap();
        SyncContext::new(config, record_store)
    }
}

fn tenant_config(tenant: TenantCode, url: String, password: &str) -> TenantConfig {
    TenantConfig {
        tenant,
        url,
        db: format!("freight_{}", tenant.suffix()),
        username: "sync@example.com".to_string(),
        password: password.to_string(),
        company_id: match tenant {
            TenantCode::Ar => 1,
            TenantCode::Cl => 2,
        },
        currency: match tenant {
            TenantCode::Ar => "ARS".to_string(),
            TenantCode::Cl => "USD".to_string(),
        },
        products: ServiceProducts::default(),
        sales_journal: None,
        purchase_journal: None,
    }
}

/// Starts both ERP tenants and the record store. `cl_password` is the
/// password the service is configured with for CL; the mock always
/// expects "secret".
pub async fn start_env_with(cl_password: &str, options: SyncOptions) -> TestEnv {
    init_tracing();

    let ar = Arc::new(RwLock::new(MockErpState::new("secret")));
    let cl = Arc::new(RwLock::new(MockErpState::new("secret")));
    let records = Arc::new(RwLock::new(MockRecordStoreState::default()));

    let ar_url = serve(create_erp_mock_server(ar.clone())).await;
    let cl_url = serve(create_erp_mock_server(cl.clone())).await;
    let records_url = serve(create_record_store_mock_server(records.clone())).await;

    tokio::time::sleep(Duration::from_millis(50)).await;

    let config = AppConfig {
        tenants: PerTenant::new(
            tenant_config(TenantCode::Ar, ar_url, "secret"),
            tenant_config(TenantCode::Cl, cl_url, cl_password),
        ),
        record_store: RecordStoreConfig {
            api_key: "keyTest".to_string(),
            base_id: "appTest".to_string(),
            base_url: format!("{}/v0", records_url),
            tables: RecordTables::default(),
        },
        schema: RecordSchema::default(),
        options,
        http_timeout: Duration::from_secs(5),
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
    };

    TestEnv { ar, cl, records, config }
}

pub async fn start_env() -> TestEnv {
    start_env_with("secret", SyncOptions::default()).await
}

pub const MASTERS: &str = "Masters";
pub const OPERATIONS: &str = "tblV9e6v8lhdMCqUG";
pub const COMPANIES: &str = "Empresas";
pub const RATE_CARDS: &str = "Tarifas";
pub const REQUEST_CARDS: &str = "tblgNDyHnuG4pppWY";
