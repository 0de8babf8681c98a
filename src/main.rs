use anyhow::{anyhow, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rapid_manifest::rapid::{self, ProviderId};
use rapid_manifest::{config::Config, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // 日志输出到 stderr，stdout 只输出秒传 JSON
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rapid_manifest=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // 用法：rapid-manifest <189|quark|auto> <share_url> [pwd] [cookie]
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        return Err(anyhow!(
            "用法: {} <189|quark|auto> <share_url> [pwd] [cookie]",
            args.first()
                .map(|s| s.as_str())
                .unwrap_or("rapid-manifest")
        ));
    }

    let share_url = args[2].clone();
    // None 表示按链接域名自动选择
    let provider = match args[1].as_str() {
        "auto" => None,
        name => Some(name.parse::<ProviderId>().map_err(|e| anyhow!(e))?),
    };
    let pwd = args.get(3).cloned().unwrap_or_default();
    let cookie = args.get(4).cloned();

    let config_path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    let config = Config::load(&config_path)?;
    if std::path::Path::new(&config_path).exists() {
        tracing::info!("✅ 配置加载完成: {}", config_path);
    } else {
        tracing::info!("✅ 配置从环境变量加载");
    }

    let state = AppState::new(config)?;
    let manifest = match provider {
        Some(provider) => {
            tracing::info!("🚀 开始解析 {} 分享...", provider);
            provider
                .resolve_share(&state, &share_url, &pwd, cookie.as_deref())
                .await?
        }
        None => {
            tracing::info!("🚀 开始解析分享（自动识别网盘）...");
            rapid::resolve_share(&state, &share_url, &pwd, cookie.as_deref()).await?
        }
    };

    let warning = provider
        .or_else(|| ProviderId::detect(&share_url))
        .and_then(|p| p.checksum_warning(&manifest));
    if let Some(warning) = warning {
        tracing::warn!("{}", warning);
    }

    println!("{}", serde_json::to_string_pretty(&manifest)?);
    Ok(())
}
