use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Context;
use jobwatch_core::{
    decode_fragment, encode_fragment, update, Effect, HostBootstrap, JobStore, Msg,
};
use jobwatch_engine::{RefreshController, ReqwestGateway, SharedStore};
use jobwatch_logging::{watch_info, watch_warn};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::commands::{self, Command};
use crate::config::AppConfig;
use crate::effects::EffectRunner;
use crate::persistence;
use crate::render;

pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    fs::create_dir_all(&config.state_dir)
        .with_context(|| format!("creating state dir {}", config.state_dir.display()))?;
    jobwatch_logging::initialize(config.log.into(), config.level(), &config.log_path());

    let bootstrap = load_bootstrap(config.bootstrap_path.as_deref())?;
    let mut store = JobStore::from_bootstrap(config.paging.into(), bootstrap);
    let fragment =
        persistence::load_fragment(&config.state_dir).or_else(|| config.fragment.clone());
    if let Some(fragment) = fragment.as_deref() {
        store.set_view_state(decode_fragment(fragment));
    }
    let interval_seconds = store.view_state().refresh_interval_seconds;
    let canonical = encode_fragment(store.view_state());
    let store: SharedStore = Arc::new(Mutex::new(store));

    let gateway = ReqwestGateway::new(
        &config.base_url,
        &config.csrf_token,
        config.gateway_settings(),
    )
    .context("building the jobs gateway")?;
    let controller = RefreshController::new(Arc::new(gateway), store.clone());
    let runner = EffectRunner::new(controller.clone(), config.state_dir.clone());

    // Rewrite whatever was restored in canonical form, then load the view.
    runner.run(vec![
        Effect::ReplaceFragment(canonical),
        Effect::Refresh,
        Effect::RefreshChart,
        Effect::RestartTimer { interval_seconds },
    ]);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut render_tick = tokio::time::interval(config.render_interval());
    println!("{}", help(&store));

    loop {
        tokio::select! {
            line = lines.next_line(), if stdin_open => {
                match line.context("reading stdin")? {
                    Some(line) => match parse(&store, &line) {
                        Ok(Command::Quit) => break,
                        Ok(Command::Help) => println!("{}", help(&store)),
                        Ok(Command::Msg(msg)) => dispatch(&store, &runner, msg),
                        Err(err) => eprintln!("{err:#}"),
                    },
                    None => {
                        watch_info!("stdin closed; watching until interrupted");
                        stdin_open = false;
                    }
                }
            }
            _ = render_tick.tick() => {
                dispatch(&store, &runner, Msg::Tick);
                let frame = {
                    let mut store = store.lock().unwrap_or_else(PoisonError::into_inner);
                    store
                        .consume_dirty()
                        .then(|| render::render(&store.view(), store.view_state()))
                };
                if let Some(frame) = frame {
                    println!("{}", frame.join("\n"));
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    controller.stop();
    watch_info!("jobwatch stopped");
    Ok(())
}

fn parse(store: &SharedStore, line: &str) -> anyhow::Result<Command> {
    let store = store.lock().unwrap_or_else(PoisonError::into_inner);
    commands::parse(line, &store)
}

fn help(store: &SharedStore) -> String {
    commands::help(&store.lock().unwrap_or_else(PoisonError::into_inner))
}

fn dispatch(store: &SharedStore, runner: &EffectRunner, msg: Msg) {
    let effects = {
        let mut store = store.lock().unwrap_or_else(PoisonError::into_inner);
        update(&mut store, msg)
    };
    runner.run(effects);
}

fn load_bootstrap(path: Option<&Path>) -> anyhow::Result<HostBootstrap> {
    let Some(path) = path else {
        watch_warn!("No bootstrap document configured; starting with an empty list");
        return Ok(HostBootstrap::default());
    };
    let document = fs::read_to_string(path)
        .with_context(|| format!("reading bootstrap {}", path.display()))?;
    let bootstrap = HostBootstrap::from_json(&document)
        .with_context(|| format!("parsing bootstrap {}", path.display()))?;
    watch_info!(
        "Bootstrapped {} job(s), {} job type(s), {} term(s)",
        bootstrap.jobs.len(),
        bootstrap.job_types.len(),
        bootstrap.terms.len()
    );
    Ok(bootstrap)
}
