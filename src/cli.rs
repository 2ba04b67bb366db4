//! CLI struct definitions for the formbuilder command-line interface.
//!
//! All clap-derived types live here. Dispatch logic lives in `lib.rs`.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "formbuilder",
    version = env!("CARGO_PKG_VERSION"),
    about = "Build multi-step forms: ordered question pages, forward-only routing, and the checks that gate making a form live."
)]
pub(crate) struct Cli {
    /// Project root holding formbuilder.toml (defaults to the current directory).
    #[clap(long, global = true)]
    pub root: Option<PathBuf>,
    /// Explicit config file; must exist when given.
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Create the data directory and database
    Init,
    /// Form lifecycle and section toggles
    Form(FormCli),
    /// Question pages within a form
    Page(PageCli),
    /// Routing conditions between pages
    Condition(ConditionCli),
    /// Task list for a form
    Status(StatusArgs),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

#[derive(clap::Args, Debug)]
pub(crate) struct StatusArgs {
    pub form_id: String,
    #[clap(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

// ===== form =====

#[derive(clap::Args, Debug)]
pub(crate) struct FormCli {
    #[clap(subcommand)]
    pub command: FormCommand,
}

#[derive(Subcommand, Debug)]
pub(crate) enum FormCommand {
    /// Create an empty form
    Create {
        #[clap(long)]
        name: String,
        #[clap(long)]
        org: Option<String>,
    },
    /// Show a form with its pages and derived routing state
    Show { form_id: String },
    /// List forms
    List {
        #[clap(long)]
        org: Option<String>,
    },
    /// Edit form fields; pass an empty string to clear one
    Update {
        form_id: String,
        #[clap(flatten)]
        fields: FormFieldArgs,
    },
    /// Delete a form with everything it owns
    Delete { form_id: String },
    /// Mark the pages section complete (or not, with --incomplete)
    CompletePages {
        form_id: String,
        #[clap(long)]
        incomplete: bool,
    },
    /// Mark the declaration section complete (or not, with --incomplete)
    CompleteDeclaration {
        form_id: String,
        #[clap(long)]
        incomplete: bool,
    },
    /// Task list for a form
    Status(StatusArgs),
    /// Publish the current draft
    MakeLive { form_id: String },
}

#[derive(clap::Args, Debug, Default)]
pub(crate) struct FormFieldArgs {
    #[clap(long)]
    pub name: Option<String>,
    #[clap(long)]
    pub org: Option<String>,
    #[clap(long)]
    pub submission_email: Option<String>,
    #[clap(long)]
    pub privacy_policy_url: Option<String>,
    #[clap(long)]
    pub what_happens_next: Option<String>,
    #[clap(long)]
    pub support_email: Option<String>,
    #[clap(long)]
    pub support_phone: Option<String>,
    #[clap(long)]
    pub support_url: Option<String>,
    #[clap(long)]
    pub support_url_text: Option<String>,
    #[clap(long)]
    pub declaration_text: Option<String>,
}

// ===== page =====

#[derive(clap::Args, Debug)]
pub(crate) struct PageCli {
    #[clap(subcommand)]
    pub command: PageCommand,
}

#[derive(Subcommand, Debug)]
pub(crate) enum PageCommand {
    /// Append a page to a form
    Add {
        form_id: String,
        #[clap(long)]
        question: String,
        #[clap(long)]
        answer_type: String,
        #[clap(flatten)]
        fields: PageFieldArgs,
    },
    /// Edit a page; omitted options keep their current value
    Update {
        page_id: String,
        #[clap(long)]
        question: Option<String>,
        #[clap(long)]
        answer_type: Option<String>,
        #[clap(flatten)]
        fields: PageFieldArgs,
    },
    /// Move a page to a 1-based position
    Move {
        page_id: String,
        #[clap(long)]
        position: u32,
    },
    /// Delete a page
    Delete { page_id: String },
    /// List a form's pages in order
    List { form_id: String },
    /// Show one page with next_page and routing errors
    Show { page_id: String },
}

#[derive(clap::Args, Debug, Default)]
pub(crate) struct PageFieldArgs {
    #[clap(long)]
    pub hint: Option<String>,
    /// Answer settings as a JSON object
    #[clap(long)]
    pub settings: Option<String>,
    #[clap(long)]
    pub optional: Option<bool>,
    #[clap(long)]
    pub heading: Option<String>,
    #[clap(long)]
    pub guidance: Option<String>,
}

// ===== condition =====

#[derive(clap::Args, Debug)]
pub(crate) struct ConditionCli {
    #[clap(subcommand)]
    pub command: ConditionCommand,
}

#[derive(clap::Args, Debug, Default)]
#[group(multiple = false)]
pub(crate) struct TargetArgs {
    /// Page to jump to when the answer matches
    #[clap(long)]
    pub goto: Option<String>,
    /// Jump past every remaining page
    #[clap(long)]
    pub skip_to_end: bool,
}

#[derive(Subcommand, Debug)]
pub(crate) enum ConditionCommand {
    /// Route from a check page on a given answer
    Add {
        check_page_id: String,
        #[clap(long)]
        answer_value: String,
        #[clap(flatten)]
        target: TargetArgs,
    },
    /// Change a condition's answer value or target
    Update {
        condition_id: String,
        #[clap(long)]
        answer_value: Option<String>,
        #[clap(flatten)]
        target: TargetArgs,
    },
    /// Delete a condition
    Delete { condition_id: String },
    /// List a form's conditions with their routing errors
    List { form_id: String },
}
