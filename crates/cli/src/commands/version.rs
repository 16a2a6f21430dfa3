use tracing::instrument;

#[instrument]
pub fn get_version_info() -> String {
    let version = env!("CARGO_PKG_VERSION");
    let description = env!("CARGO_PKG_DESCRIPTION");
    let library = lockscope_workspaces::Config::default();

    tracing::debug!(package_version = version, "Gathering package information");

    format!(
        "lockscope {version} - {description}\n\
        Default lockfile name: {}\n\
        Correlation ID: {}",
        library.workspace_lockfile_filename,
        crate::tracing::correlation_id()
    )
}
