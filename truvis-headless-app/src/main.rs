use truvis_crate_tools::init_log::init_log;

mod app;

use app::{HeadlessApp, HeadlessConfig};

fn panic_handler(info: &std::panic::PanicHookInfo) {
    log::error!("{}", info);
}

/// 用法：`headless-frame [frame_count]`
fn main() -> anyhow::Result<()> {
    std::panic::set_hook(Box::new(panic_handler));

    init_log();
    tracy_client::Client::start();
    tracy_client::set_thread_name!("HeadlessThread");

    let mut config = HeadlessConfig::default();
    if let Some(arg) = std::env::args().nth(1) {
        config.frame_count = arg.parse().map_err(|e| anyhow::anyhow!("invalid frame count {arg:?}: {e}"))?;
    }
    log::info!("run headless frame graph: {config:?}");

    let mut app = HeadlessApp::new(config)?;
    app.run();
    app.destroy();
    Ok(())
}
