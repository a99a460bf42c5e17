//! Build pipeline: config synthesis, compiler invocation, alias rewriting.
//!
//! ```text
//! nest-cli.json ─► synthesize ─► tsconfig.build.*.tmp.json ─► tsc ─► rewrite
//!                                      (removed afterwards)        dist/<service>
//! ```

pub mod pipeline;
pub mod rewrite;
pub mod synth;
pub mod toolchain;

pub use pipeline::{BuildReport, BuiltService, CompilationPipeline};
pub use rewrite::{rewrite, AliasRewriter};
pub use synth::{synthesize, BuildConfig, CompilerOptions, StandaloneOptions};
pub use toolchain::{Toolchain, Tsc};
