pub mod pool;
pub mod allocator;
pub mod normalizer;
pub mod resolver;
pub mod rewriter;
pub mod sweep;
pub mod detector;

pub use pool::*;
pub use allocator::*;
pub use normalizer::*;
pub use resolver::*;
pub use rewriter::*;
pub use sweep::*;
pub use detector::*;
