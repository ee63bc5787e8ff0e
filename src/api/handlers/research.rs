use crate::{
    AppState,
    research::coordinator::{ResearchCoordinator, ResearchEvent, ResearchSettings},
    types::{Query, ResearchRequest, ResearchResponse, Result},
};
use axum::{
    Json,
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, StreamExt};
use serde_json::{Value, json};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Liveness probe
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Run a research session and return the finished brief
pub async fn deep_research(
    State(state): State<AppState>,
    Json(payload): Json<ResearchRequest>,
) -> Result<Json<ResearchResponse>> {
    let start = Instant::now();
    let coordinator = coordinator_for(&state, &payload);

    let brief = coordinator
        .research(&payload.query, &CancellationToken::new(), None)
        .await?;

    Ok(Json(ResearchResponse {
        rendered: brief.render(),
        brief,
        duration_ms: start.elapsed().as_millis() as u64,
    }))
}

/// Run a research session, streaming `progress` events followed by a single
/// `brief` or `error` event
pub async fn research_stream(
    State(state): State<AppState>,
    Json(payload): Json<ResearchRequest>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    // reject blank input before the stream starts so it maps to a 400
    let query = Query::new(&payload.query)?;
    let coordinator = coordinator_for(&state, &payload);

    let events = coordinator
        .stream(query.as_str().to_string(), CancellationToken::new())
        .map(|event| Ok(to_sse_event(&event)));

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

fn coordinator_for(state: &AppState, payload: &ResearchRequest) -> Arc<ResearchCoordinator> {
    if payload.concurrency.is_none() && payload.deadline_secs.is_none() {
        return state.coordinator.clone();
    }
    let settings: ResearchSettings = state
        .coordinator
        .settings()
        .with_overrides(payload.concurrency, payload.deadline_secs);
    Arc::new(state.coordinator.with_settings(settings))
}

fn to_sse_event(event: &ResearchEvent) -> Event {
    let (name, data) = match event {
        ResearchEvent::Progress(progress) => ("progress", serde_json::to_string(progress)),
        ResearchEvent::Brief(brief) => ("brief", serde_json::to_string(brief)),
        ResearchEvent::Error { message } => ("error", serde_json::to_string(&json!({ "error": message }))),
    };

    match data {
        Ok(data) => Event::default().event(name).data(data),
        Err(e) => Event::default()
            .event("error")
            .data(json!({ "error": e.to_string() }).to_string()),
    }
}
