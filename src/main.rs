use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use clap::{Args, Parser, Subcommand};
use colored::{ColoredString, Colorize};
use eyre::{Result, eyre};
use std::path::PathBuf;
use todostore::view::{self, CategoryFilter};
use todostore::{Backend, Config, KvStore, NewCategory, NewTask, Priority, Substrate, Task, TaskPatch, TaskStore};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "todostore")]
#[command(about = "Personal task list kept in local storage")]
#[command(version)]
struct Cli {
    /// Path to the config file (default: <config dir>/todostore/config.yaml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the stored collections
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Storage backend: sqlite or files
    #[arg(short, long, value_parser = parse_backend)]
    backend: Option<Backend>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List tasks, newest first
    List {
        /// Only show tasks in this category
        #[arg(short, long)]
        category: Option<String>,
    },

    /// Create a task
    Add(AddArgs),

    /// Show one task in full
    Show { id: String },

    /// Change fields of a task
    Edit(EditArgs),

    /// Mark a task done, or not done again
    Toggle { id: String },

    /// Delete a task
    Delete { id: String },

    /// Show total, completed and pending counts
    Stats,

    /// Manage categories
    #[command(subcommand)]
    Category(CategoryCommands),

    /// Print the effective configuration
    Config {
        /// Also write it to the config file
        #[arg(long)]
        save: bool,
    },
}

#[derive(Args)]
struct AddArgs {
    title: String,

    #[arg(short, long, default_value = "")]
    description: String,

    #[arg(short, long, value_parser = parse_priority, default_value = "medium")]
    priority: Priority,

    /// Due date as YYYY-MM-DD
    #[arg(long, value_parser = parse_due)]
    due: Option<DateTime<Utc>>,

    /// Category id (default: the first category)
    #[arg(short, long)]
    category: Option<String>,
}

#[derive(Args)]
struct EditArgs {
    id: String,

    #[arg(short, long)]
    title: Option<String>,

    #[arg(short, long)]
    description: Option<String>,

    #[arg(short, long, value_parser = parse_priority)]
    priority: Option<Priority>,

    /// Due date as YYYY-MM-DD
    #[arg(long, value_parser = parse_due, conflicts_with = "clear_due")]
    due: Option<DateTime<Utc>>,

    /// Remove the due date
    #[arg(long)]
    clear_due: bool,

    #[arg(short, long)]
    category: Option<String>,
}

#[derive(Subcommand)]
enum CategoryCommands {
    /// List categories
    List,

    /// Create a category
    Add {
        name: String,
        /// Colour as #RRGGBB
        color: String,
    },

    /// Delete a category; its tasks become uncategorized
    Delete { id: String },
}

fn parse_backend(s: &str) -> Result<Backend, String> {
    s.parse().map_err(|e: eyre::Report| e.to_string())
}

fn parse_priority(s: &str) -> Result<Priority, String> {
    s.parse().map_err(|e: eyre::Report| e.to_string())
}

fn parse_due(s: &str) -> Result<DateTime<Utc>, String> {
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("Invalid date {}: {}", s, e))?;
    Ok(date.and_time(NaiveTime::default()).and_utc())
}

fn required_title(title: &str) -> Result<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(eyre!("Task title cannot be empty"));
    }
    Ok(title.to_string())
}

fn tint(text: &str, hex: &str) -> ColoredString {
    match view::parse_hex_color(hex) {
        Some((r, g, b)) => text.truecolor(r, g, b),
        None => text.normal(),
    }
}

fn category_badge<S: KvStore>(store: &TaskStore<S>, id: &str) -> ColoredString {
    let label = view::category_label(store.categories(), id);
    match store.category(id) {
        Some(category) => tint(label, &category.color),
        None => label.dimmed(),
    }
}

fn print_task_line<S: KvStore>(store: &TaskStore<S>, task: &Task, today: NaiveDate) {
    let check = if task.completed { "[x]".green() } else { "[ ]".normal() };
    let title = if task.completed {
        task.title.strikethrough().dimmed()
    } else {
        task.title.bold()
    };

    println!(
        "{} {} {} {} {}  {}",
        check,
        title,
        tint(task.priority.label(), task.priority.color()),
        view::due_label(task.due_date, today).cyan(),
        category_badge(store, &task.category),
        task.id.dimmed()
    );
}

fn print_task_detail<S: KvStore>(store: &TaskStore<S>, task: &Task, today: NaiveDate) {
    let status = if task.completed { "done".green() } else { "pending".yellow() };
    println!("{}", task.title.bold());
    println!("  id:          {}", task.id);
    println!("  status:      {}", status);
    println!("  priority:    {}", tint(task.priority.label(), task.priority.color()));
    println!("  category:    {}", category_badge(store, &task.category));
    match task.due_date {
        Some(due) => println!("  due:         {} ({})", due.format("%Y-%m-%d"), view::due_label(Some(due), today)),
        None => println!("  due:         {}", view::due_label(None, today)),
    }
    if !task.description.is_empty() {
        println!("  description: {}", task.description);
    }
    println!("  created:     {}", task.created_at.to_rfc3339());
    println!("  updated:     {}", task.updated_at.to_rfc3339());
}

fn load_config(cli: &Cli) -> Result<(Config, Option<PathBuf>)> {
    let path = cli.config.clone().or_else(Config::default_path);
    let mut config = match &path {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    if let Some(data_dir) = &cli.data_dir {
        config.data_dir = data_dir.clone();
    }
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }

    Ok((config, path))
}

/// Open the configured substrate and load the store from it
async fn open_store(config: &Config) -> Result<TaskStore<Substrate>> {
    let substrate = Substrate::open(config)?;
    Ok(TaskStore::open(substrate).await)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so they never mix with listings
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let (config, config_path) = load_config(&cli)?;
    let today = Utc::now().date_naive();

    match cli.command {
        Commands::List { category } => {
            let store = open_store(&config).await?;
            let tasks = view::visible_tasks(store.tasks(), &CategoryFilter::from(category));
            if tasks.is_empty() {
                println!("{}", "No tasks".dimmed());
            }
            for task in tasks {
                print_task_line(&store, task, today);
            }
        }
        Commands::Add(args) => {
            let mut store = open_store(&config).await?;
            let category = args
                .category
                .or_else(|| store.categories().first().map(|c| c.id.clone()))
                .unwrap_or_default();

            let task = store
                .add_task(NewTask {
                    title: required_title(&args.title)?,
                    description: args.description.trim().to_string(),
                    priority: args.priority,
                    completed: false,
                    due_date: args.due,
                    category,
                })
                .await?;
            println!("Created {}", task.id);
        }
        Commands::Show { id } => {
            let store = open_store(&config).await?;
            let task = store.task(&id).ok_or_else(|| eyre!("Task not found: {}", id))?;
            print_task_detail(&store, task, today);
        }
        Commands::Edit(args) => {
            let mut store = open_store(&config).await?;
            let patch = TaskPatch {
                title: args.title.as_deref().map(required_title).transpose()?,
                description: args.description.map(|d| d.trim().to_string()),
                priority: args.priority,
                completed: None,
                due_date: if args.clear_due { Some(None) } else { args.due.map(Some) },
                category: args.category,
            };
            if patch.is_empty() {
                return Err(eyre!("Nothing to change"));
            }

            let task = store
                .update_task(&args.id, patch)
                .await?
                .ok_or_else(|| eyre!("Task not found: {}", args.id))?;
            print_task_detail(&store, &task, today);
        }
        Commands::Toggle { id } => {
            let mut store = open_store(&config).await?;
            let task = store
                .toggle_task(&id)
                .await?
                .ok_or_else(|| eyre!("Task not found: {}", id))?;
            print_task_line(&store, &task, today);
        }
        Commands::Delete { id } => {
            let mut store = open_store(&config).await?;
            if !store.delete_task(&id).await? {
                return Err(eyre!("Task not found: {}", id));
            }
            println!("Deleted {}", id);
        }
        Commands::Stats => {
            let store = open_store(&config).await?;
            let stats = store.get_stats();
            println!("Total:     {}", stats.total.to_string().bold());
            println!("Completed: {}", stats.completed.to_string().green());
            println!("Pending:   {}", stats.pending.to_string().yellow());
        }
        Commands::Category(CategoryCommands::List) => {
            let store = open_store(&config).await?;
            for category in store.categories() {
                let count = store.get_tasks_by_category(&category.id).len();
                println!(
                    "{}  {} ({} tasks)  {}",
                    tint("●", &category.color),
                    category.name,
                    count,
                    category.id.dimmed()
                );
            }
        }
        Commands::Category(CategoryCommands::Add { name, color }) => {
            let mut store = open_store(&config).await?;
            if view::parse_hex_color(&color).is_none() {
                return Err(eyre!("Invalid colour {} (expected #RRGGBB)", color));
            }
            let category = store.add_category(NewCategory { name, color }).await?;
            println!("Created category {}", category.id);
        }
        Commands::Category(CategoryCommands::Delete { id }) => {
            let mut store = open_store(&config).await?;
            if !store.delete_category(&id).await? {
                return Err(eyre!("Category not found: {}", id));
            }
            println!("Deleted category {}", id);
        }
        Commands::Config { save } => {
            print!("{}", serde_yaml::to_string(&config)?);
            if save {
                let path = config_path.ok_or_else(|| eyre!("No config path available, pass --config"))?;
                config.save(&path)?;
                println!("Saved to {}", path.display());
            }
        }
    }

    Ok(())
}
