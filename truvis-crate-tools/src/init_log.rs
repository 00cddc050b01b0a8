use std::io::Write;

/// 日志配置
///
/// `RUST_LOG` 环境变量存在时会覆盖 `level`
#[derive(Clone, Copy, Debug)]
pub struct LogConfig {
    pub level: log::LevelFilter,
    /// 是否打印 `[file:line]`
    pub show_location: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: log::LevelFilter::Info,
            show_location: true,
        }
    }
}

/// 使用默认配置初始化日志
pub fn init_log() {
    init_log_with(LogConfig::default());
}

/// 重复调用时不会 panic，只会保留第一次的配置
pub fn init_log_with(config: LogConfig) {
    let show_location = config.show_location;
    let result = env_logger::Builder::new()
        .filter(None, config.level)
        .parse_default_env()
        .format(move |buf, record| {
            let level_style = match record.level() {
                log::Level::Info => {
                    buf.default_level_style(log::Level::Info).fg_color(Some(anstyle::AnsiColor::Green.into()))
                }
                log::Level::Warn => {
                    buf.default_level_style(log::Level::Warn).fg_color(Some(anstyle::AnsiColor::Yellow.into()))
                }
                log::Level::Error => {
                    buf.default_level_style(log::Level::Error).fg_color(Some(anstyle::AnsiColor::Red.into()))
                }
                level => buf.default_level_style(level),
            };
            let grey_style = anstyle::Style::new().fg_color(Some(anstyle::Color::Rgb(anstyle::RgbColor(110, 110, 110))));

            let time = chrono::Local::now().format("%H:%M:%S%.3f");
            let level = record.level();

            if show_location {
                let line = record.line().unwrap_or(0);
                // windows 下 file 使用反斜杠
                let file = record.file().unwrap_or("").rsplit(['\\', '/']).next().unwrap_or("");
                writeln!(
                    buf,
                    "{level_style}[{time}] {level:<5}{level_style:#} {grey_style}[{file}:{line}]{grey_style:#} {}",
                    record.args()
                )
            } else {
                writeln!(buf, "{level_style}[{time}] {level:<5}{level_style:#} {}", record.args())
            }
        })
        .try_init();

    if let Err(e) = result {
        log::debug!("logger already initialized: {e}");
    }
}
