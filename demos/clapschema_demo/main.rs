//! # clapschema demo application
//!
//! A sample CLI tool that shows how a schema turns into a command line. This
//! is **not** a real app; it exists to demonstrate and manually verify
//! clapschema's layering.
//!
//! ## Running
//!
//! ```sh
//! cargo run --example clapschema_demo -- print-name
//! cargo run --example clapschema_demo -- config list
//! ```
//!
//! ## Features demonstrated
//!
//! | Feature              | How to exercise it                                                        |
//! |----------------------|---------------------------------------------------------------------------|
//! | Schema defaults      | `cargo run --example clapschema_demo -- print-name`                       |
//! | Positional arguments | `cargo run --example clapschema_demo -- print-name Yo Ma`                 |
//! | Named flags          | `cargo run --example clapschema_demo -- print-age --age 40`               |
//! | Environment          | `surname=Lee cargo run --example clapschema_demo -- print-name`           |
//! | `.env` file          | Put `surname=Lee` in `./.env`, then run `print-name`                      |
//! | Config file          | Put `[clapschema]` + `age = 7` in `./demo.cfg`, then run `print-age`      |
//! | Post-init hook       | `print-name Yo` gives nickname `Yo`; it follows the merged `name`         |
//! | Version token        | `cargo run --example clapschema_demo -- version`                          |
//! | `config get`         | `cargo run --example clapschema_demo -- config get age`                   |
//! | Logging              | `RUST_LOG=clapschema=debug cargo run --example clapschema_demo -- config` |

use clapschema::{App, Field, FieldType, Schema};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let schema = Schema::declare("clapschema-demo")
        .field(
            Field::new("name")
                .ty(FieldType::String)
                .default("Klimenko")
                .doc("Your first name"),
        )
        .field(
            Field::new("surname")
                .ty(FieldType::String)
                .default("Ma")
                .doc("Surname"),
        )
        .field(
            Field::new("age")
                .ty(FieldType::Integer)
                .default(132)
                .doc("Age is just a number"),
        )
        .field(Field::new("cwd").ty(FieldType::Path).default("").doc("Working directory"))
        .field(Field::new("cfg").ty(FieldType::Path).default("").doc("Config file override"))
        .version(env!("CARGO_PKG_VERSION"))
        .post_init(|init| {
            let nickname = match init.get("name").and_then(|v| v.as_str()) {
                Some(name) => name.chars().take(3).collect::<String>(),
                None => String::new(),
            };
            init.set("nickname", nickname)
        })
        .build_or_exit();

    let app = App::new(&schema)
        .about("Greets people using layered configuration")
        .command("print-name", "Print the full name", |config| {
            println!(
                "{} {} ({})",
                config.get_str("name")?,
                config.get_str("surname")?,
                config.get_str("nickname")?
            );
            Ok(())
        })
        .command("print-age", "Print the age", |config| {
            let age: i64 = config.get_as("age")?;
            println!("{age}");
            Ok(())
        })
        .with_config_command();

    if let Err(e) = app.run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
