use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use rollcall_core::Gallery;
use rollcall_store::{NewStudent, Store};
use rollcalld::{enroll, CommandOracle, Config};

#[derive(Parser)]
#[command(name = "rollcall", about = "Rollcall attendance administration CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the full student roster
    Students,
    /// Show one student's profile and attendance history
    Student {
        /// Student id
        id: String,
    },
    /// Register a new student
    Register {
        /// Student id (also the enrollment image stem)
        id: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        program: String,
        #[arg(long)]
        section: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        phone: String,
        /// Admission date, YYYY-MM-DD
        #[arg(long)]
        admission_date: NaiveDate,
        /// Enrollment photo to copy into the faces directory
        #[arg(long)]
        photo: Option<PathBuf>,
    },
    /// Today's attendance with Late / On Time remarks
    Attendance,
    /// Dashboard counters: total, present, absent
    Stats,
    /// Dry-run the enrollment directory through the face oracle
    Scan,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    let store = Store::open(&config.db_path)
        .await
        .with_context(|| format!("opening database {}", config.db_path.display()))?;

    match cli.command {
        Commands::Students => {
            let students = store.all_students().await?;
            println!("{}", serde_json::to_string_pretty(&students)?);
        }
        Commands::Student { id } => {
            let Some(profile) = store.student(&id).await? else {
                bail!("student {id} not found");
            };
            let history = store.attendance_history(&id).await?;
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "student": profile,
                    "history": history,
                }))?
            );
        }
        Commands::Register {
            id,
            name,
            program,
            section,
            email,
            phone,
            admission_date,
            photo,
        } => {
            store
                .add_student(NewStudent {
                    id: id.clone(),
                    name,
                    program,
                    section,
                    email,
                    phone,
                    admission_date,
                    photo_url: None,
                })
                .await?;
            println!("registered student {id}");

            if let Some(photo) = photo {
                install_enrollment_photo(&config, &id, &photo)?;
            }
        }
        Commands::Attendance => {
            let rows = store
                .today_attendance(Local::now().date_naive(), config.late_cutoff)
                .await?;
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        Commands::Stats => {
            let stats = store.dashboard_stats(Local::now().date_naive()).await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Commands::Scan => {
            let Some(cmd) = config.oracle_cmd.clone() else {
                bail!("ROLLCALL_ORACLE_CMD must be set for scan");
            };
            let oracle = Arc::new(CommandOracle::new(cmd));
            let gallery = Arc::new(Gallery::new());
            let faces_dir = config.faces_dir.clone();
            let report = {
                let gallery = Arc::clone(&gallery);
                tokio::task::spawn_blocking(move || {
                    enroll::load_gallery(&faces_dir, oracle.as_ref(), &gallery)
                })
                .await?
            };
            println!(
                "enrolled {} / no face {} / failed {}",
                report.enrolled, report.no_face, report.failed
            );
        }
    }

    Ok(())
}

/// Copy the enrollment photo into the faces directory as `<id>.<ext>` so
/// the daemon enrolls it at its next gallery load. When the oracle is
/// configured, warn early if the image has no detectable face.
fn install_enrollment_photo(config: &Config, id: &str, photo: &std::path::Path) -> Result<()> {
    let ext = photo
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .context("photo has no file extension")?;
    if !matches!(ext.as_str(), "jpg" | "jpeg" | "png") {
        bail!("unsupported photo format .{ext} (use jpg, jpeg, or png)");
    }

    std::fs::create_dir_all(&config.faces_dir)
        .with_context(|| format!("creating {}", config.faces_dir.display()))?;
    let target = config.faces_dir.join(format!("{id}.{ext}"));
    std::fs::copy(photo, &target)
        .with_context(|| format!("copying photo to {}", target.display()))?;
    println!("installed enrollment photo {}", target.display());

    if let Some(cmd) = &config.oracle_cmd {
        let oracle = CommandOracle::new(cmd.clone());
        let gallery = Gallery::new();
        match enroll::enroll_image(&target, id, &oracle, &gallery) {
            Ok(()) => println!("face detected, ready for enrollment"),
            Err(enroll::EnrollError::NoFace) => {
                tracing::warn!(file = %target.display(), "no face detected in enrollment photo");
                println!("warning: no face detected in the photo");
            }
            Err(error) => {
                tracing::warn!(%error, "enrollment photo check failed");
            }
        }
    }

    Ok(())
}
