//! StarLore dedicated server entry point (spec §6.2), converted from
//! `original_source/src/server/server.c`'s own `main`.

use std::net::TcpListener;
use std::thread;

use rand::Rng;
use socket2::{Domain, Socket, Type};

use starlore_common::log::{log_fatal, log_info};
use starlore_common::world::GameMap;

use starlore_server::context::ServerContext;
use starlore_server::{connection, simulation};

/// World generation parameters handed to every client on join via
/// `GameWorldInit`. Not a tunable constant table entry (spec §6.3 doesn't
/// fix these), so the server picks them once at startup.
const WORLD_OCTAVES: i32 = 4;
const WORLD_BIAS: f32 = 2.0;

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 2 {
        eprintln!("usage: {} <port>", args.first().map(String::as_str).unwrap_or("starlore-server"));
        std::process::exit(1);
    }

    let port: u16 = match args[1].parse() {
        Ok(p) => p,
        Err(_) => {
            eprintln!("usage: {} <port> (port must be a number)", args[0]);
            std::process::exit(1);
        }
    };

    let listener = bind_listener(port).unwrap_or_else(|e| log_fatal(&format!("bind failed: {e}")));

    let seed: u32 = rand::thread_rng().gen();
    let map = GameMap::new(seed, WORLD_OCTAVES, WORLD_BIAS);
    log_info(&format!("world seed {seed}, {WORLD_OCTAVES} octaves, bias {WORLD_BIAS}"));

    let ctx = ServerContext::new(map);

    let sim_ctx = ctx.clone();
    thread::spawn(move || simulation::run(sim_ctx));

    if let Err(e) = connection::accept_loop(ctx, listener) {
        log_fatal(&format!("accept loop terminated: {e}"));
    }
}

fn bind_listener(port: u16) -> std::io::Result<TcpListener> {
    let socket = Socket::new(Domain::IPV4, Type::STREAM, None)?;
    socket.set_reuse_address(true)?;
    let addr: std::net::SocketAddrV4 = format!("0.0.0.0:{port}").parse().unwrap();
    socket.bind(&addr.into())?;
    socket.listen(128)?;
    Ok(socket.into())
}
