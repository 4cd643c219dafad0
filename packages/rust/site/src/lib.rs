//! Daily record archive, static site rendering, and deployment.
//!
//! The archive is the system's published history: one JSON record per date,
//! overwritten atomically on re-runs. The renderer rebuilds the whole site
//! from that history; the deployer pushes the result to Cloudflare Pages.

pub mod archive;
pub mod deploy;
pub mod render;

pub use archive::{load_history, record_path, save_record};
pub use deploy::{Deployer, WranglerDeployer};
pub use render::render_site;
