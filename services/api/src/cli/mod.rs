//! softclin-api CLI 分发：`run`、`generate-secrets`、`doctor`、`version`。

use anyhow::anyhow;
use serde_json::json;
use uuid::Uuid;

use crate::{
    auth::credentials::hash_password,
    config::{Config, describe_keys},
};

/// `generate-secrets` 未提供密码时使用的默认密码。
const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

/// CLI 分发结果。
pub(crate) enum CliDispatch {
    /// 继续启动 HTTP 服务。
    Run,
    /// 命令已处理完成，主程序应退出。
    Exit,
}

/// 解析并执行 CLI。
pub(crate) fn dispatch(args: &[String]) -> anyhow::Result<CliDispatch> {
    if args.is_empty() {
        return Ok(CliDispatch::Run);
    }

    let cmd = args[0].trim();
    if cmd.is_empty() || cmd == "run" {
        return Ok(CliDispatch::Run);
    }

    if matches!(cmd, "-h" | "--help" | "help") {
        print_root_help();
        return Ok(CliDispatch::Exit);
    }

    match cmd {
        "generate-secrets" => {
            let password = args.get(1).map(String::as_str).unwrap_or(DEFAULT_ADMIN_PASSWORD);
            run_generate_secrets(password)?;
            Ok(CliDispatch::Exit)
        }
        "doctor" => {
            let format = parse_doctor_format(&args[1..])?;
            run_doctor(format);
            Ok(CliDispatch::Exit)
        }
        "version" => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(CliDispatch::Exit)
        }
        other => Err(anyhow!(
            "unknown command: {other}; run `softclin-api --help` for usage"
        )),
    }
}

/// 打印可直接写入 `.env` 的签名密钥与管理员密码哈希。
fn run_generate_secrets(password: &str) -> anyhow::Result<()> {
    if password.is_empty() {
        return Err(anyhow!("password must not be empty"));
    }
    let hash = hash_password(password, bcrypt::DEFAULT_COST)
        .map_err(|err| anyhow!("hash password failed: {err}"))?;

    println!("# generated by softclin-api {}", env!("CARGO_PKG_VERSION"));
    println!("JWT_SECRET={}", generate_secret());
    println!("JWT_REFRESH_SECRET={}", generate_secret());
    println!("ADMIN_USERNAME=admin");
    println!("ADMIN_PASSWORD_HASH={hash}");
    if password == DEFAULT_ADMIN_PASSWORD {
        eprintln!("warning: default password in use; pass a password argument for production");
    }
    Ok(())
}

/// 64 位 hex 签名密钥，由两段 UUIDv4 拼接。
fn generate_secret() -> String {
    format!(
        "{}{}",
        Uuid::new_v4().simple(),
        Uuid::new_v4().simple()
    )
}

/// `doctor` 输出格式。
enum DoctorFormat {
    Text,
    Json,
}

/// 解析 doctor 的 `--format` 参数。
fn parse_doctor_format(args: &[String]) -> anyhow::Result<DoctorFormat> {
    if args.is_empty() {
        return Ok(DoctorFormat::Text);
    }
    if args.len() == 2 && args[0] == "--format" {
        return match args[1].as_str() {
            "text" => Ok(DoctorFormat::Text),
            "json" => Ok(DoctorFormat::Json),
            other => Err(anyhow!("unsupported doctor format: {other}")),
        };
    }
    Err(anyhow!("usage: softclin-api doctor [--format text|json]"))
}

/// 打印配置自检结果（不输出密钥内容），配置不可用时以非零码退出。
fn run_doctor(format: DoctorFormat) {
    let lookup = |key: &str| std::env::var(key).ok();
    let keys = describe_keys(lookup);
    let loaded = Config::from_lookup(lookup);

    match format {
        DoctorFormat::Text => {
            for (key, state) in &keys {
                println!("{key}: {state}");
            }
            match &loaded {
                Ok(config) => println!("config: ok ({} mode)", config.strategy.name()),
                Err(err) => println!("config: error ({err})"),
            }
        }
        DoctorFormat::Json => {
            let entries = keys
                .iter()
                .map(|(key, state)| (key.to_string(), json!(state)))
                .collect::<serde_json::Map<String, serde_json::Value>>();
            let payload = json!({
                "keys": entries,
                "configOk": loaded.is_ok(),
                "mode": loaded.as_ref().ok().map(|config| config.strategy.name()),
                "error": loaded.as_ref().err().map(ToString::to_string),
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&payload).unwrap_or_else(|_| "{}".to_string())
            );
        }
    }

    if loaded.is_err() {
        std::process::exit(1);
    }
}

/// 打印 root help。
fn print_root_help() {
    println!("softclin-api usage:");
    println!("  softclin-api run");
    println!("  softclin-api generate-secrets [password]");
    println!("  softclin-api doctor [--format text|json]");
    println!("  softclin-api version");
}
