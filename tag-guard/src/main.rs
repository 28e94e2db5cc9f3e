// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use actix_web::rt::System;
use actix_web::{App, HttpServer, middleware::Logger, web};
use futures_util::future::try_join_all;
use log::info;
use prometheus::Registry;
use std::path::PathBuf;

use tag_guard::config::{Config, ValidatedConfig};
use tag_guard::logging;
use tag_guard::metrics_server;
use tag_guard::proxy::{self, Upstream};
use tag_guard::routing::TagRouting;

fn main() {
    let exit_code = run();
    std::process::exit(exit_code);
}

fn run() -> i32 {
    let parsed_args = match parse_args_from(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(error) => {
            eprintln!("❌ Invalid command line arguments: {}", error);
            eprintln!("❌ Use -C <root> to set the directory holding config.yaml.");
            return 1;
        }
    };

    if parsed_args.help {
        print!("{}", help_text());
        return 0;
    }

    let config = match Config::load_and_validate(&parsed_args.runtime_root) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("❌ {}", error);
            eprintln!("❌ Tag guard cannot start with invalid configuration.");
            return 1;
        }
    };

    if let Err(error) = logging::init_logger(config.log_level) {
        eprintln!("❌ Failed to initialize logger: {}", error);
        return 1;
    }

    match System::new().block_on(run_server(config)) {
        Ok(()) => 0,
        Err(error) => {
            eprintln!("❌ Server failed: {}", error);
            1
        }
    }
}

async fn run_server(config: ValidatedConfig) -> std::io::Result<()> {
    let registry = Registry::new();

    // Registered once here, before any worker starts serving.
    let tag_routing = TagRouting::new(
        config.revision_identity(),
        config.routing.enable_fallback,
        &registry,
    );
    info!(
        "Tag guard for revision '{}' in namespace '{}' (fallback: {}, metrics: {})",
        config.identity.revision,
        config.identity.namespace,
        config.routing.enable_fallback,
        tag_routing.metrics_enabled()
    );

    let upstream_config = config.upstream.clone();
    let max_body_bytes = upstream_config.max_body_bytes();
    let (host, port) = config.server_address();
    info!("Proxying {}:{} to {}", host, port, upstream_config.url);

    let guard_server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(Upstream::new(&upstream_config)))
            .app_data(web::PayloadConfig::new(max_body_bytes))
            .wrap(tag_routing.clone())
            .wrap(Logger::default())
            .default_service(web::to(proxy::forward))
    })
    .workers(config.server.workers)
    .bind((host, port))?
    .run();

    let mut servers = vec![guard_server];

    if let Some((metrics_host, metrics_port)) = config.metrics_address() {
        info!("Serving metrics on {}:{}", metrics_host, metrics_port);
        let registry = web::Data::new(registry);
        let metrics_server = HttpServer::new(move || {
            App::new()
                .app_data(registry.clone())
                .configure(metrics_server::configure)
        })
        .workers(1)
        .bind((metrics_host, metrics_port))?
        .run();
        servers.push(metrics_server);
    }

    try_join_all(servers).await?;
    info!("Tag guard stopped");
    Ok(())
}

struct ParsedArgs {
    runtime_root: PathBuf,
    help: bool,
}

fn parse_args_from<I>(args: I) -> Result<ParsedArgs, String>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let mut parsed = ParsedArgs {
        runtime_root: PathBuf::from("."),
        help: false,
    };

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => parsed.help = true,
            "-C" => {
                let value = args
                    .next()
                    .ok_or_else(|| "Missing value for -C".to_string())?;
                parsed.runtime_root = PathBuf::from(value);
            }
            other => return Err(format!("Unexpected argument '{}'", other)),
        }
    }

    Ok(parsed)
}

fn help_text() -> String {
    "Usage: tag-guard [-C <root>]\n\n\
     Reads <root>/config.yaml (default root: current directory), rejects requests whose\n\
     X-Request-Tag contradicts X-Tag-Resolved and proxies the rest to the upstream.\n"
        .to_string()
}
