use std::sync::Arc;

use clap::{Parser, Subcommand};
use dialoguer::{Input, Password};
use dotenvy::dotenv;

use classmark::cli::{create_student, create_teacher};
use classmark::classmark_auth::{PgTokenStore, TokenService};
use classmark::classmark_db::{init_db_pool, run_migrations};
use classmark::repositories::{PgStudentRepository, PgTeacherRepository};

#[derive(Parser)]
#[command(name = "classmark-cli")]
#[command(about = "Administrative tools for the Classmark auth service", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a teacher account
    CreateTeacher {
        #[arg(short = 'f', long)]
        first_name: Option<String>,

        #[arg(short = 'l', long)]
        last_name: Option<String>,

        #[arg(short = 'e', long)]
        email: Option<String>,

        /// Password (will be prompted securely if not provided)
        #[arg(short = 'p', long)]
        password: Option<String>,
    },
    /// Create a student account
    CreateStudent {
        /// Student number used to request sign-in links
        #[arg(short = 'n', long)]
        student_number: Option<String>,

        #[arg(short = 'f', long)]
        first_name: Option<String>,

        #[arg(short = 'l', long)]
        last_name: Option<String>,

        /// Where sign-in links are sent
        #[arg(short = 'e', long)]
        email: Option<String>,
    },
    /// Delete every expired token now
    SweepTokens,
    /// Apply pending database migrations
    Migrate,
}

fn prompt(value: Option<String>, label: &str) -> String {
    value.unwrap_or_else(|| match Input::new().with_prompt(label).interact_text() {
        Ok(value) => value,
        Err(e) => fail(format!("Failed to read {}: {}", label.to_lowercase(), e)),
    })
}

fn fail(message: String) -> ! {
    eprintln!("\n❌ {}", message);
    std::process::exit(1);
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    let cli = Cli::parse();
    let pool = init_db_pool()
        .await
        .unwrap_or_else(|e| fail(format!("Database connection failed: {}", e)));

    match cli.command {
        Commands::CreateTeacher {
            first_name,
            last_name,
            email,
            password,
        } => {
            let first_name = prompt(first_name, "First name");
            let last_name = prompt(last_name, "Last name");
            let email = prompt(email, "Email address");
            let password = password.unwrap_or_else(|| {
                match Password::new()
                    .with_prompt("Password")
                    .with_confirmation("Confirm password", "Passwords don't match")
                    .interact()
                {
                    Ok(password) => password,
                    Err(e) => fail(format!("Failed to read password: {}", e)),
                }
            });

            let repo = PgTeacherRepository::new(pool);
            match create_teacher(&repo, &first_name, &last_name, &email, &password).await {
                Ok(teacher) => {
                    println!("\n✅ Teacher created successfully!");
                    println!("   ID: {}", teacher.id);
                    println!("   Email: {}", teacher.email);
                }
                Err(e) => fail(format!("Error creating teacher: {:#}", e)),
            }
        }
        Commands::CreateStudent {
            student_number,
            first_name,
            last_name,
            email,
        } => {
            let student_number = prompt(student_number, "Student number");
            let first_name = prompt(first_name, "First name");
            let last_name = prompt(last_name, "Last name");
            let email = prompt(email, "Email address");

            let repo = PgStudentRepository::new(pool);
            match create_student(&repo, &student_number, &first_name, &last_name, &email).await {
                Ok(student) => {
                    println!("\n✅ Student created successfully!");
                    println!("   ID: {}", student.id);
                    println!("   Number: {}", student.student_number);
                }
                Err(e) => fail(format!("Error creating student: {:#}", e)),
            }
        }
        Commands::SweepTokens => {
            let tokens = TokenService::new(Arc::new(PgTokenStore::new(pool)));
            match tokens.sweep_expired().await {
                Ok(count) => println!("✅ Removed {} expired token(s)", count),
                Err(e) => fail(format!("Sweep failed: {}", e)),
            }
        }
        Commands::Migrate => match run_migrations(&pool).await {
            Ok(()) => println!("✅ Migrations applied"),
            Err(e) => fail(format!("Migration failed: {}", e)),
        },
    }
}
