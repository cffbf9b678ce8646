pub mod config;
pub mod ctx;
pub mod ops;

use ctx::LogCtx;

// One typed context per CLI/server operation
pub fn ingest() -> LogCtx<ops::ingest::Ingest> { LogCtx::new() }
pub fn init() -> LogCtx<ops::init::Init> { LogCtx::new() }
pub fn sub() -> LogCtx<ops::sub::Sub> { LogCtx::new() }
pub fn posts() -> LogCtx<ops::posts::Posts> { LogCtx::new() }
pub fn trends() -> LogCtx<ops::trends::Trends> { LogCtx::new() }
pub fn serve() -> LogCtx<ops::serve::Serve> { LogCtx::new() }
pub fn probe() -> LogCtx<ops::probe::Probe> { LogCtx::new() }
