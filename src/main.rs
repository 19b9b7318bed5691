use anyhow::{bail, Context};
use clap::{Args as ClapArgs, Parser, Subcommand};
use printdeck::backend::{Api, Backend};
use printdeck::cache::{CacheState, CapabilityCache, DataService};
use printdeck::channel;
use printdeck::localization::{Language, LocalizationService, LocalizedCapabilities};
use printdeck::modal::{ConsoleModalHost, ModalManager};
use printdeck::model::{CapabilityKind, Device, DeviceId, Page, PageId};
use printdeck::repository::{Capabilities, Data};
use printdeck::server::HttpServer;
use printdeck::workbench::Workbench;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

/// printdeck: printer device and page configurator
///
/// printdeck: 打印设备与打印页配置器
#[derive(Parser, Debug)]
#[command(name = "printdeck")]
#[command(version)]
#[command(about = "Configure printer devices and their print pages", long_about = None)]
#[command(help_template = "{name} {version}\n\n{about}\n\n{usage-heading} {usage}\n\n{all-args}")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Message channel endpoint used by client commands
    ///
    /// 客户端命令连接的消息通道地址
    #[arg(short, long, global = true, default_value = "ws://127.0.0.1:3000/ipc")]
    url: String,

    /// Request timeout in seconds
    ///
    /// 请求超时（秒）
    #[arg(short, long, global = true, default_value = "30")]
    timeout_secs: u64,

    /// Skip confirmation dialogs
    ///
    /// 跳过确认对话框
    #[arg(short, long, global = true)]
    yes: bool,

    /// Display language for labels and dialogs (english, klingon)
    ///
    /// 标签与对话框的显示语言
    #[arg(long, global = true, default_value = "english")]
    language: Language,

    /// Log level (trace, debug, info, warn, error)
    ///
    /// 日志级别 (trace, debug, info, warn, error)
    #[arg(short = 'l', long, global = true, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the backend (message channel, REST API, static files)
    ///
    /// 启动后端（消息通道、REST 接口、静态文件）
    Serve(ServeArgs),
    /// List devices
    Devices,
    /// List pages, optionally of one device
    Pages {
        #[arg(short, long)]
        device: Option<DeviceId>,
    },
    /// Add a device (localized default name when omitted)
    AddDevice { name: Option<String> },
    /// Add a page with default settings to a device
    AddPage { device: DeviceId },
    /// Delete a device and its pages
    DeleteDevice { id: DeviceId },
    /// Delete a page
    DeletePage { id: PageId },
    /// Rename a device
    RenameDevice { id: DeviceId, name: String },
    /// Set one field on several pages (pageSize, printQuality, mediaType, destination)
    SetPage {
        field: CapabilityKind,
        value: String,
        #[arg(required = true)]
        ids: Vec<PageId>,
    },
    /// Show the selectable options of a page field
    Options { kind: CapabilityKind },
}

#[derive(ClapArgs, Debug)]
struct ServeArgs {
    /// HTTP port (next free port is used when occupied)
    ///
    /// HTTP 端口（被占用时自动使用下一个可用端口）
    #[arg(short, long, default_value = "3000")]
    port: u16,

    /// Listen on all interfaces instead of localhost
    ///
    /// 监听所有网络接口（局域网可访问）
    #[arg(long)]
    public: bool,

    /// Directory served at `/`
    ///
    /// 静态文件目录
    #[arg(long, default_value = "dist")]
    static_dir: PathBuf,

    /// Start with demo devices and pages
    ///
    /// 使用演示数据启动
    #[arg(long)]
    seed: bool,
}

impl Default for ServeArgs {
    fn default() -> Self {
        Self {
            port: 3000,
            public: false,
            static_dir: PathBuf::from("dist"),
            seed: false,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 根据参数设置日志级别
    let log_level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            eprintln!("⚠️  Invalid log level '{}', using 'info'", args.log_level);
            Level::INFO
        }
    };

    // 初始化日志（RUST_LOG 优先），输出到 stderr，stdout 留给命令结果
    let subscriber = tracing_subscriber::fmt().with_writer(std::io::stderr);
    if std::env::var_os("RUST_LOG").is_some() {
        subscriber.with_env_filter(EnvFilter::from_default_env()).init();
    } else {
        subscriber.with_max_level(log_level).init();
    }

    let timeout = Duration::from_secs(args.timeout_secs);
    match args.command {
        None => serve(ServeArgs::default()).await,
        Some(Command::Serve(serve_args)) => serve(serve_args).await,
        Some(command) => run_client(command, &args.url, timeout, args.yes, args.language).await,
    }
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    info!("🚀 printdeck starting...");
    info!("📋 Configuration:");
    info!("   Port: {}", args.port);
    info!("   Public: {}", args.public);
    info!("   Static dir: {:?}", args.static_dir);
    info!("   Seed data: {}", args.seed);

    let data = if args.seed { Data::seeded() } else { Data::new() };
    let backend = Backend::spawn(Api::new(data, Capabilities::new()));

    let server = HttpServer::new(args.port, args.public, args.static_dir, backend)?;
    if server.get_actual_port() != server.requested_port() {
        warn!(
            "⚠️  Port {} is in use, using {} instead",
            server.requested_port(),
            server.get_actual_port()
        );
    }
    let listener = server.listen().await?;

    tokio::select! {
        result = server.serve(listener) => result?,
        _ = tokio::signal::ctrl_c() => info!("🛑 Shutting down"),
    }
    Ok(())
}

async fn run_client(
    command: Command,
    url: &str,
    timeout: Duration,
    yes: bool,
    language: Language,
) -> anyhow::Result<()> {
    let client = channel::ws::connect(url, timeout)
        .await
        .with_context(|| format!("Is the server running at {}?", url))?;
    let data = DataService::new(client.clone());
    let localization = Arc::new(LocalizationService::new(language));
    let modals = Arc::new(ModalManager::new(Arc::new(ConsoleModalHost)));
    let workbench = Workbench::new(data.clone(), modals, localization.clone());
    // 等快照的时间比单个请求的超时稍长
    let within = timeout + Duration::from_secs(1);

    match command {
        Command::Serve(_) => bail!("serve is not a client command"),
        Command::Devices => {
            for device in load_devices(&data, within).await? {
                println!("{}\t{}", device.id, device.name);
            }
        }
        Command::Pages { device } => {
            let pages = load_pages(&data, within).await?;
            println!("id\tdevice\tpageSize\tprintQuality\tmediaType\tdestination");
            for page in pages.iter().filter(|page| device.map_or(true, |id| page.device_id == id)) {
                println!(
                    "{}\t{}\t{}\t{}\t{}\t{}",
                    page.id, page.device_id, page.page_size, page.print_quality, page.media_type, page.destination
                );
            }
        }
        Command::AddDevice { name } => {
            let added = match name {
                Some(name) => data.add_new_device(&name).await?,
                None => workbench.add_device().await?,
            };
            report(added, "Device added")?;
        }
        Command::AddPage { device } => {
            report(data.add_new_page(device).await?, "Page added")?;
        }
        Command::DeleteDevice { id } => {
            let deleted = if yes {
                data.delete_device(id).await?
            } else {
                // 对话框里显示设备名
                load_devices(&data, within).await?;
                if !workbench.delete_device(id).await? {
                    println!("Cancelled or not found");
                    return Ok(());
                }
                true
            };
            report(deleted, "Device deleted")?;
        }
        Command::DeletePage { id } => {
            let deleted = if yes {
                data.delete_page(id).await?
            } else if workbench.delete_page(id).await? {
                true
            } else {
                println!("Cancelled or not found");
                return Ok(());
            };
            report(deleted, "Page deleted")?;
        }
        Command::RenameDevice { id, name } => {
            report(data.update_device_name(id, &name).await?, "Device renamed")?;
        }
        Command::SetPage { field, value, ids } => {
            let options = CapabilityCache::new(client).get(field).await?;
            if !options.iter().any(|option| option.value == value) {
                let allowed: Vec<_> = options.iter().map(|option| option.value.as_str()).collect();
                bail!("'{}' is not a valid {} (expected one of: {})", value, field, allowed.join(", "));
            }
            report(data.update_page_field(field, &ids, &value).await?, "Pages updated")?;
        }
        Command::Options { kind } => {
            let localized = LocalizedCapabilities::spawn(CapabilityCache::new(client), localization);
            let mut updates = localized.subscribe();
            tokio::time::timeout(within, updates.changed())
                .await
                .context("Timed out loading options")??;
            for option in localized.options(kind) {
                println!("{}\t{}", option.value, option.label);
            }
        }
    }
    Ok(())
}

fn report(success: bool, message: &str) -> anyhow::Result<()> {
    if !success {
        bail!("Rejected by the backend (unknown id?)");
    }
    println!("✅ {}", message);
    Ok(())
}

async fn load_devices(data: &DataService, within: Duration) -> anyhow::Result<Vec<Device>> {
    let mut updates = data.subscribe_devices();
    data.devices();
    if data.devices_state() != CacheState::Populated {
        tokio::time::timeout(within, updates.changed())
            .await
            .context("Timed out loading devices")??;
    }
    Ok(data.devices())
}

async fn load_pages(data: &DataService, within: Duration) -> anyhow::Result<Vec<Page>> {
    let mut updates = data.subscribe_pages();
    data.pages();
    if data.pages_state() != CacheState::Populated {
        tokio::time::timeout(within, updates.changed())
            .await
            .context("Timed out loading pages")??;
    }
    Ok(data.pages())
}
