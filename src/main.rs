//! Treehouse CLI
//!
//! Boots a local sandbox for a project tree JSON file, runs the bootstrap
//! sequence, and prints the preview URL once the dev server is up.

use treehouse::{BootstrapConfig, BootstrapOrchestrator, FolderNode, LocalRuntime, Phase};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <tree.json>", args[0]);
        eprintln!("\nMounts the project tree into a local sandbox, installs its");
        eprintln!("dependencies, starts the dev server, and prints the preview URL.");
        eprintln!("\nEnvironment variables:");
        eprintln!("  TREEHOUSE_PM=npm|pnpm|yarn  Package manager to drive (default: npm)");
        std::process::exit(1);
    }

    let tree_path = &args[1];
    let raw = match std::fs::read_to_string(tree_path) {
        Ok(raw) => raw,
        Err(e) => {
            eprintln!("Error: failed to read {}: {}", tree_path, e);
            std::process::exit(1);
        }
    };
    let tree: FolderNode = match serde_json::from_str(&raw) {
        Ok(tree) => tree,
        Err(e) => {
            eprintln!("Error: {} is not a valid project tree: {}", tree_path, e);
            std::process::exit(1);
        }
    };

    let mut config = BootstrapConfig::default();
    if let Ok(pm) = std::env::var("TREEHOUSE_PM") {
        config = config.with_package_manager(pm);
    }

    let runtime = match LocalRuntime::boot() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: failed to boot sandbox: {}", e);
            std::process::exit(1);
        }
    };
    println!("Sandbox root: {}", runtime.root().display());

    let orchestrator = BootstrapOrchestrator::start(runtime, config);

    // Mirror sandbox process output to stdout.
    let (replay, mut live) = orchestrator.relay().attach();
    tokio::spawn(async move {
        for chunk in replay {
            println!("{}", chunk);
        }
        while let Ok(chunk) = live.recv().await {
            println!("{}", chunk);
        }
    });

    let mut preview = orchestrator.subscribe_preview();

    if let Err(e) = orchestrator.bootstrap(&tree).await {
        eprintln!("Error: bootstrap failed: {}", e);
        let _ = orchestrator.teardown().await;
        std::process::exit(1);
    }

    println!("Waiting for the dev server...");
    loop {
        if preview.changed().await.is_err() {
            break;
        }
        let update = preview.borrow().clone();
        if let Some(update) = update {
            println!("Preview ready: {}", update.url);
            break;
        }
    }

    // Keep relaying output until interrupted.
    if let Err(e) = tokio::signal::ctrl_c().await {
        eprintln!("Error: failed to wait for ctrl-c: {}", e);
    }
    let phase: Phase = orchestrator.phase();
    println!("Shutting down (phase was {:?})", phase);
    if let Err(e) = orchestrator.teardown().await {
        eprintln!("Error: teardown failed: {}", e);
    }
}
