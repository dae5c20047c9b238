use crate::error::LocationError;
use crate::geo::Coordinate;

/// Single-shot position fix.
pub trait LocationProvider: Send + Sync {
    type Fut<'a>: Future<Output = Result<Coordinate, LocationError>> + Send + 'a
    where
        Self: 'a;

    fn locate<'a>(&'a self) -> Self::Fut<'a>;
}
