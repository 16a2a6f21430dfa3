pub mod closure;
pub mod generate;
pub mod reporter;
pub mod version;

pub use generate::GenerateArgs;

use lockscope_workspaces::ClosurePolicy;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub enum Command {
    Version,
    Generate(GenerateArgs),
    Closure {
        name: String,
        cwd: PathBuf,
        policy: ClosurePolicy,
    },
}

impl Command {
    /// Name used in the command span.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Version => "version",
            Self::Generate(_) => "generate",
            Self::Closure { .. } => "closure",
        }
    }
}
