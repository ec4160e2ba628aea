pub mod campaign;
pub mod blueprint;
pub mod vuln_report;
pub mod exploit_result;
pub mod episode;
pub mod scoring;

pub use campaign::*;
pub use blueprint::*;
pub use vuln_report::*;
pub use exploit_result::*;
pub use episode::*;
pub use scoring::*;
