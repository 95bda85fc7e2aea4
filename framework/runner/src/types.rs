/// Recommended error type for a `main` function that drives the runner. Every error type of the
/// runner converts into it, so `?` can be used throughout.
pub type MongoperfResult<T> = anyhow::Result<T>;
