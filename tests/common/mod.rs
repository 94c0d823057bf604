//! Local stand-in for the spreadsheet export endpoint.

#![allow(dead_code)]

use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use claims_portal::sheets::SheetLoader;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::TcpListener;

pub const SPREADSHEET_ID: &str = "test-spreadsheet";

/// What the CSV export answers for one sheet name.
#[derive(Clone)]
pub struct MockSheet {
    pub status: u16,
    pub body: String,
}

impl MockSheet {
    pub fn csv(body: &str) -> Self {
        MockSheet {
            status: 200,
            body: body.to_string(),
        }
    }

    pub fn failing(status: u16, body: &str) -> Self {
        MockSheet {
            status,
            body: body.to_string(),
        }
    }
}

type Sheets = Arc<HashMap<String, MockSheet>>;

fn gviz(payload: &str) -> String {
    format!(
        "/*O_o*/\ngoogle.visualization.Query.setResponse({});",
        payload
    )
}

fn json_export(sheet: Option<&MockSheet>, name: &str) -> String {
    match sheet {
        Some(s) if s.status == 200 && !s.body.trim_start().starts_with('<') => {
            let header = s.body.lines().next().unwrap_or("");
            let cols: Vec<String> = header
                .split(',')
                .enumerate()
                .map(|(i, label)| {
                    format!(
                        r#"{{"id":"{}","label":"{}","type":"string"}}"#,
                        (b'A' + i as u8) as char,
                        label.trim_matches('"')
                    )
                })
                .collect();
            gviz(&format!(
                r#"{{"version":"0.6","status":"ok","table":{{"cols":[{}],"rows":[]}}}}"#,
                cols.join(",")
            ))
        }
        _ => gviz(&format!(
            r#"{{"version":"0.6","status":"error","errors":[{{"reason":"invalid_query","message":"INVALID_QUERY","detailed_message":"Invalid sheet: {}"}}]}}"#,
            name
        )),
    }
}

async fn export(
    State(sheets): State<Sheets>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let name = params.get("sheet").cloned().unwrap_or_default();
    let sheet = sheets.get(&name);

    if params.get("tqx").map(String::as_str) == Some("out:json") {
        return (StatusCode::OK, json_export(sheet, &name)).into_response();
    }

    match sheet {
        Some(s) => (
            StatusCode::from_u16(s.status).unwrap(),
            s.body.clone(),
        )
            .into_response(),
        None => (
            StatusCode::OK,
            "<!DOCTYPE html><html><body>Sign in to continue</body></html>".to_string(),
        )
            .into_response(),
    }
}

/// Serve the given sheets on an ephemeral port and return the base URL.
pub async fn spawn_sheet_server(sheets: Vec<(&str, MockSheet)>) -> String {
    let sheets: Sheets = Arc::new(
        sheets
            .into_iter()
            .map(|(name, sheet)| (name.to_string(), sheet))
            .collect(),
    );
    let app = Router::new()
        .route("/spreadsheets/d/:id/gviz/tq", get(export))
        .with_state(sheets);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Loader pointed at a mock server, bypassing any proxy settings.
pub fn local_loader(base_url: &str) -> SheetLoader {
    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    SheetLoader::with_client(client, base_url, SPREADSHEET_ID)
}
