/// Failures reported by the host while drawing.
///
/// The engine never retries; errors are handed back to the caller of [`crate::Ticker::render`].
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("paint failed at x={x}: {reason}")]
    Paint { x: i32, reason: String },
    #[error("surface is {actual} pixels wide but the ticker expects {expected}")]
    SurfaceSize { expected: i32, actual: i32 },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
