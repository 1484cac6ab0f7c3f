pub mod procs;
pub mod ws;

pub use procs::procs_router;
pub use ws::ws_router;

pub async fn health() -> &'static str {
    "ok"
}
