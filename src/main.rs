use anyhow::Context;
use chrono::{NaiveTime, Utc};
use clap::Parser;
use users_etl::utils::{logger, validation::Validate};
use users_etl::{
    build_users_dag, CliConfig, ConfigProvider, Dag, DagRunReport, DagRunner, LocalStorage,
    RunType, TomlConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    if cli.log_json {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting users-etl");
    tracing::debug!("CLI config: {:?}", cli);

    let exit_code = match &cli.config {
        Some(path) => {
            tracing::info!("📁 Loading configuration from: {}", path);
            let mut config = TomlConfig::from_file(path)
                .with_context(|| format!("failed to load config file '{}'", path))?;
            if cli.persist {
                config.load.persist = true;
            }
            let monitor = cli.monitor || config.monitoring_enabled();
            run(&config, &cli, monitor).await
        }
        None => run(&cli, &cli, cli.monitor).await,
    };

    if exit_code > 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}

async fn run<C>(config: &C, cli: &CliConfig, monitor: bool) -> i32
where
    C: ConfigProvider + Validate,
{
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        return 1;
    }

    let dag = build_users_dag(config, LocalStorage::new(".".to_string()));

    if cli.show_dag {
        return match show_dag(&dag, cli.upcoming) {
            Ok(()) => 0,
            Err(e) => {
                eprintln!("❌ {}", e.user_friendly_message());
                e.exit_code()
            }
        };
    }

    let logical_date = cli
        .logical_date
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
        .unwrap_or_else(Utc::now);

    if monitor {
        tracing::info!("🔍 System monitoring enabled");
    }
    let runner = DagRunner::new(dag).with_monitoring(monitor);

    match runner
        .run(logical_date, RunType::Manual)
        .await
        .and_then(DagRunReport::into_result)
    {
        Ok(report) => {
            tracing::info!("✅ DAG run {} completed successfully", report.run_id);
            tracing::debug!("Run summary: {:?}", report.summary());
            0
        }
        Err(e) => {
            tracing::error!(
                "❌ DAG run failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            e.exit_code()
        }
    }
}

fn show_dag(dag: &Dag, upcoming: usize) -> users_etl::Result<()> {
    let settings = dag.settings();
    let order = dag.execution_order()?;

    println!("DAG:         {}", settings.dag_id);
    println!("Description: {}", settings.description);
    println!("Schedule:    {}", settings.schedule);
    println!("Start date:  {}", settings.start_date);
    println!("Tasks:");
    for task_id in order {
        let upstream = dag.upstream_of(task_id);
        if upstream.is_empty() {
            println!("  {}", task_id);
        } else {
            println!("  {} (after {})", task_id, upstream.join(", "));
        }
    }

    let runs = settings
        .schedule
        .upcoming(settings.start_datetime(), Utc::now(), upcoming);
    if !runs.is_empty() {
        println!("Next runs:");
        for run in runs {
            println!("  {}", run.to_rfc3339());
        }
    }
    Ok(())
}
