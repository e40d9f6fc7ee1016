//! `pawguard`: command-line client for the PawGuard server.
//!
//! # Usage
//!
//! ```
//! pawguard identify dog.jpg
//! pawguard report dog.jpg --address "MG Road, Bengaluru" --user-id u1 --user-name Asha
//! pawguard --user paws --password secret assign <report-id>
//! pawguard --config ~/.config/pawguard/config.toml reports --status new
//! ```

mod client;
mod render;
mod settings;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use clap::{Parser, Subcommand};
use client::ApiClient;
use pawguard_core::{
  animal::{AnimalStatus, Species},
  report::{ReportStatus, RescueOutcome, WelfareFlag},
};
use serde_json::json;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "pawguard", about = "Command-line client for PawGuard")]
struct Args {
  /// Path to a TOML config file (url, username, password).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Base URL of the PawGuard server (default: http://localhost:8080).
  #[arg(long, env = "PAWGUARD_URL")]
  url: Option<String>,

  /// NGO username.
  #[arg(long, env = "PAWGUARD_USER")]
  user: Option<String>,

  /// NGO password (plaintext).
  #[arg(long, env = "PAWGUARD_PASSWORD")]
  password: Option<String>,

  /// Print raw JSON instead of text.
  #[arg(long, global = true)]
  json: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Identify the animal in a photo.
  Identify {
    image:   PathBuf,
    /// `cloud` or `yolo`; defaults to the server's backend.
    #[arg(long)]
    backend: Option<String>,
  },
  /// Identify a photo and file it as a sighting.
  Report {
    image:     PathBuf,
    #[arg(long)]
    address:   String,
    #[arg(long)]
    user_id:   String,
    #[arg(long)]
    user_name: String,
    #[arg(long, requires = "lng")]
    lat:       Option<f64>,
    #[arg(long, requires = "lat")]
    lng:       Option<f64>,
    #[arg(long)]
    phone:     Option<String>,
    #[arg(long)]
    notes:     Option<String>,
    #[arg(long)]
    condition: Option<String>,
    /// Attach the sighting to this registry record.
    #[arg(long = "match", value_name = "ANIMAL_ID")]
    match_animal_id: Option<Uuid>,
    #[arg(long)]
    backend:   Option<String>,
  },
  /// List registry records.
  Animals {
    #[arg(long)]
    status: Option<AnimalStatus>,
    #[arg(long)]
    region: Option<String>,
    #[arg(long)]
    limit:  Option<usize>,
  },
  /// Show one registry record.
  Animal { id: Uuid },
  /// Find records of a species with an overlapping breed or colour.
  Search {
    species: Species,
    #[arg(long, default_value = "")]
    breed:   String,
    #[arg(long, default_value = "")]
    color:   String,
    #[arg(long)]
    region:  Option<String>,
  },
  /// List reports.
  Reports {
    #[arg(long)]
    status:   Option<ReportStatus>,
    #[arg(long)]
    disaster: bool,
    /// Only reports filed by this user id.
    #[arg(long)]
    reporter: Option<String>,
    #[arg(long)]
    limit:    Option<usize>,
  },
  /// Show a report and its status history.
  Show { id: Uuid },
  /// Move a report to a new status (NGO).
  Status {
    id:     Uuid,
    status: ReportStatus,
    #[arg(long)]
    notes:  Option<String>,
  },
  /// Assign a report to your NGO (NGO).
  Assign { id: Uuid },
  /// Set a welfare flag: vaccinated, neutered or rescued (NGO).
  Welfare {
    id:    Uuid,
    flag:  WelfareFlag,
    #[arg(action = clap::ArgAction::Set)]
    value: bool,
    #[arg(long)]
    notes: Option<String>,
  },
  /// Record the rescue outcome (NGO).
  Outcome { id: Uuid, outcome: RescueOutcome },
  /// Replace the NGO notes; an empty string clears them (NGO).
  Notes { id: Uuid, notes: String },
  /// Reports within a radius of a point.
  Zone {
    #[arg(long, allow_negative_numbers = true)]
    lat:           f64,
    #[arg(long, allow_negative_numbers = true)]
    lng:           f64,
    #[arg(long)]
    radius_km:     f64,
    #[arg(long)]
    disaster_only: bool,
  },
  /// Turn disaster mode on or off for a zone (NGO).
  Disaster {
    #[arg(long, allow_negative_numbers = true)]
    lat:       f64,
    #[arg(long, allow_negative_numbers = true)]
    lng:       f64,
    #[arg(long)]
    radius_km: f64,
    #[arg(long)]
    off:       bool,
  },
  /// Follow live report events.
  Watch,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();

  let file_cfg = match &args.config {
    Some(path) => settings::ConfigFile::read(path)?,
    None => settings::ConfigFile::default(),
  };
  let api_config = settings::resolve(args.url, args.user, args.password, file_cfg);
  let client = ApiClient::new(api_config)?;

  run(&client, args.command, args.json).await
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

fn mime_for(path: &Path) -> &'static str {
  match path
    .extension()
    .and_then(|e| e.to_str())
    .map(str::to_ascii_lowercase)
    .as_deref()
  {
    Some("png") => "image/png",
    Some("webp") => "image/webp",
    Some("gif") => "image/gif",
    Some("heic") => "image/heic",
    _ => "image/jpeg",
  }
}

fn read_image(path: &Path) -> Result<(String, &'static str)> {
  let bytes =
    std::fs::read(path).with_context(|| format!("reading image {}", path.display()))?;
  if bytes.is_empty() {
    bail!("{} is empty", path.display());
  }
  Ok((B64.encode(bytes), mime_for(path)))
}

async fn run(client: &ApiClient, command: Command, json: bool) -> Result<()> {
  match command {
    Command::Identify { image, backend } => {
      let (data, mime) = read_image(&image)?;
      let id = client.identify(&data, mime, backend.as_deref()).await?;
      if json {
        return print_json(&id);
      }
      println!("{}", render::identification(&id));
    }

    Command::Report {
      image,
      address,
      user_id,
      user_name,
      lat,
      lng,
      phone,
      notes,
      condition,
      match_animal_id,
      backend,
    } => {
      let (data, mime) = read_image(&image)?;
      let id = client.identify(&data, mime, backend.as_deref()).await?;
      eprintln!("{}", render::identification(&id));

      let coordinates = lat.zip(lng).map(|(lat, lng)| json!({ "lat": lat, "lng": lng }));
      let body = json!({
        "image_base64": data,
        "mime_type": mime,
        "identification": id,
        "reporter": { "user_id": user_id, "user_name": user_name },
        "reporter_phone": phone,
        "location": { "address": address, "coordinates": coordinates },
        "notes": notes,
        "condition": condition,
        "match_animal_id": match_animal_id,
      });
      let sighting = client.submit_sighting(&body).await?;
      if json {
        return print_json(&sighting);
      }
      println!("filed {}", render::report_line(&sighting.report));
      println!("animal {}", render::animal_line(&sighting.animal));
    }

    Command::Animals {
      status,
      region,
      limit,
    } => {
      let animals = client.list_animals(status, region.as_deref(), limit).await?;
      if json {
        return print_json(&animals);
      }
      for a in &animals {
        println!("{}", render::animal_line(a));
      }
    }

    Command::Animal { id } => print_json(&client.get_animal(id).await?)?,

    Command::Search {
      species,
      breed,
      color,
      region,
    } => {
      let animals = client
        .search_animals(species, &breed, &color, region.as_deref())
        .await?;
      if json {
        return print_json(&animals);
      }
      if animals.is_empty() {
        println!("no similar animals");
      }
      for a in &animals {
        println!("{}", render::animal_line(a));
      }
    }

    Command::Reports {
      status,
      disaster,
      reporter,
      limit,
    } => {
      let reports = client
        .list_reports(status, disaster.then_some(true), reporter.as_deref(), limit)
        .await?;
      if json {
        return print_json(&reports);
      }
      for r in &reports {
        println!("{}", render::report_line(r));
      }
    }

    Command::Show { id } => {
      let report = client.get_report(id).await?;
      let history = client.report_history(id).await?;
      if json {
        return print_json(&json!({ "report": report, "history": history }));
      }
      println!("{}", render::report_line(&report));
      if let Some(notes) = &report.ngo_notes {
        println!("  notes: {notes}");
      }
      for c in &history {
        println!("  {}", render::change_line(c));
      }
    }

    Command::Status { id, status, notes } => {
      let r = client.set_status(id, status, notes.as_deref()).await?;
      println!("{}", render::report_line(&r));
    }

    Command::Assign { id } => {
      let r = client.assign(id).await?;
      println!("{}", render::report_line(&r));
    }

    Command::Welfare {
      id,
      flag,
      value,
      notes,
    } => {
      let r = client.set_welfare(id, flag, value, notes.as_deref()).await?;
      println!("{}", render::report_line(&r));
    }

    Command::Outcome { id, outcome } => {
      let r = client.set_outcome(id, outcome).await?;
      println!("{}", render::report_line(&r));
    }

    Command::Notes { id, notes } => {
      let r = client.set_notes(id, &notes).await?;
      println!("{}", render::report_line(&r));
    }

    Command::Zone {
      lat,
      lng,
      radius_km,
      disaster_only,
    } => {
      let reports = client
        .reports_in_zone(lat, lng, radius_km, disaster_only)
        .await?;
      if json {
        return print_json(&reports);
      }
      for r in &reports {
        println!("{}", render::report_line(r));
      }
    }

    Command::Disaster {
      lat,
      lng,
      radius_km,
      off,
    } => {
      let updated = client.set_disaster_mode(lat, lng, radius_km, !off).await?;
      let state = if off { "off" } else { "on" };
      println!("disaster mode {state} for {updated} report(s)");
    }

    Command::Watch => {
      client
        .watch_events(|name, data| {
          if json {
            println!("{data}");
            return;
          }
          match serde_json::from_str::<pawguard_core::report::ReportEvent>(data) {
            Ok(event) => println!("{name:<8} {}", render::report_line(&event.report)),
            Err(_) => println!("{name:<8} {data}"),
          }
        })
        .await?;
    }
  }
  Ok(())
}
