/********************************************************************************
 * Copyright (c) 2024 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

mod config;

use crate::config::Config;
use a1t_streamer::broker::StreamBroker;
use a1t_streamer::controller::{EiController, PolicyController, StatusRelay};
use a1t_streamer::correlation::{Correlator, FanOut};
use a1t_streamer::southbound::SouthboundManager;
use a1t_streamer::TargetRegistry;
use a1t_transport_tcp::TcpConnector;
use clap::Parser;
use status_notifier_http::HttpStatusNotifier;
use std::error::Error;
use std::sync::Arc;
use target_registry_static_file::TargetRegistryStaticFile;
use tracing::info;

#[derive(Parser)]
#[command()]
struct StreamerArgs {
    #[arg(short, long, value_name = "FILE")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let _ = tracing_subscriber::fmt::try_init();

    info!("Started configurable-a1t-streamer");

    let args = StreamerArgs::parse();
    let config = Config::load(&args.config)?;

    let registry = Arc::new(TargetRegistry::new());
    TargetRegistryStaticFile::new(&config.registry.file_path)
        .load_into(&registry)
        .await?;

    let broker = Arc::new(StreamBroker::from_config(&config.streamer));
    let relay = Arc::new(StatusRelay::new(
        broker.clone(),
        Arc::new(HttpStatusNotifier::new(&config.notifier)?),
        &config.streamer,
    ));
    let manager = Arc::new(
        SouthboundManager::new(
            broker.clone(),
            Arc::new(TcpConnector::new(config.transport.clone())),
            config.streamer.clone(),
        )
        .with_status_relay(relay),
    );
    let manager_task = manager.spawn(registry.subscribe().await);

    let fan_out = Arc::new(FanOut::new(Arc::new(Correlator::new(
        broker,
        &config.streamer,
    ))));
    let policies = PolicyController::new(registry.clone(), fan_out.clone());
    let jobs = EiController::new(registry.clone(), fan_out);
    info!(
        "Serving policy types {:?} and EI types {:?}",
        policies.policy_types().await,
        jobs.ei_types().await
    );

    tokio::signal::ctrl_c().await?;

    info!("Shutting down");
    manager.close_all().await;
    manager_task.await?;

    Ok(())
}
