use std::io;
use std::path;

use anyhow::bail;
use anyhow::Result;
use clap::builder::PossibleValuesParser;
use clap::value_parser;
use clap::Arg;
use clap::ArgAction;
use clap::ArgMatches;
use clap::Command;
use clap_complete::generate;
use clap_complete::Generator;
use clap_complete::Shell;
use dialoguer::theme::ColorfulTheme;
use dialoguer::Password;
use strum::VariantNames;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use yansi::Paint;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::ApiBox;
use crate::domain::models::Event;
use crate::domain::models::LocationType;
use crate::domain::models::LocationTypeDraft;
use crate::domain::models::NoticeLevel;
use crate::domain::models::OrgUnit;
use crate::domain::models::OrgUnitDraft;
use crate::domain::models::PasswordChange;
use crate::domain::models::Position;
use crate::domain::models::PositionDraft;
use crate::domain::models::ProfileDraft;
use crate::domain::models::Resource;
use crate::domain::models::Role;
use crate::domain::models::RoleDraft;
use crate::domain::models::SessionStatus;
use crate::domain::models::SortDirection;
use crate::domain::services::field_errors::FieldErrors;
use crate::domain::services::ListQuery;
use crate::domain::services::MutationOutcome;
use crate::domain::services::ProfileService;
use crate::domain::services::SessionManager;
use crate::infrastructure::api::HttpApi;

fn print_completions<G: Generator>(gen: G, cmd: &mut Command) {
    generate(gen, cmd, cmd.get_name().to_string(), &mut io::stdout());
    std::process::exit(0);
}

async fn create_config_file() -> Result<()> {
    let config_file_path_str = Config::default(ConfigKey::ConfigFile);
    let config_file_path = path::PathBuf::from(&config_file_path_str);
    if config_file_path.exists() {
        bail!(format!(
            "Config file already exists at {config_file_path_str}"
        ));
    }

    if !config_file_path.parent().unwrap().exists() {
        fs::create_dir_all(config_file_path.parent().unwrap()).await?;
    }

    let mut file = fs::File::create(config_file_path.clone()).await?;
    file.write_all(Config::serialize_default(build()).as_bytes())
        .await?;

    let config_path_display = config_file_path.as_os_str().to_str().unwrap();
    println!("Created default config file at {config_path_display}");
    return Ok(());
}

fn subcommand_completions() -> Command {
    return Command::new("completions")
        .about("Generates shell completions.")
        .arg(
            clap::Arg::new("shell")
                .short('s')
                .long("shell")
                .help("Which shell to generate completions for.")
                .action(ArgAction::Set)
                .value_parser(value_parser!(Shell))
                .required(true),
        );
}

fn subcommand_config() -> Command {
    return Command::new("config")
        .about("Configuration file options.")
        .subcommand(
            Command::new("create").about("Saves the default config file to the configuration file path. This command will fail if the file exists already.")
        )
        .subcommand(
            Command::new("default").about("Outputs the default configuration file to stdout.")
        )
        .subcommand(
            Command::new("path").about("Returns the default path for the configuration file.")
        );
}

fn arg_id() -> Arg {
    return Arg::new("id")
        .help("Entity id.")
        .value_parser(value_parser!(u64))
        .required(true);
}

fn list_args(cmd: Command) -> Command {
    return cmd
        .arg(
            Arg::new("page")
                .long("page")
                .help("Page to fetch.")
                .value_parser(value_parser!(u32))
                .default_value("1"),
        )
        .arg(
            Arg::new("search")
                .long("search")
                .num_args(1)
                .help("Search term applied server-side."),
        )
        .arg(
            Arg::new("sort-by")
                .long("sort-by")
                .num_args(1)
                .help("Field to sort by."),
        )
        .arg(
            Arg::new("order")
                .long("order")
                .num_args(1)
                .requires("sort-by")
                .value_parser(PossibleValuesParser::new(SortDirection::VARIANTS))
                .help("Sort direction, paired with --sort-by."),
        );
}

fn draft_args(cmd: Command) -> Command {
    return cmd
        .arg(Arg::new("name").long("name").required(true).help("Name."))
        .arg(
            Arg::new("description")
                .long("description")
                .default_value("")
                .help("Description."),
        );
}

fn no_extra_args(cmd: Command) -> Command {
    return cmd;
}

fn position_args(cmd: Command) -> Command {
    return cmd.arg(
        Arg::new("org-unit")
            .long("org-unit")
            .value_parser(value_parser!(u64))
            .help("Id of the organizational unit this position belongs to."),
    );
}

fn org_unit_args(cmd: Command) -> Command {
    return cmd
        .arg(
            Arg::new("location-type")
                .long("location-type")
                .value_parser(value_parser!(u64))
                .help("Id of the unit's location type."),
        )
        .arg(
            Arg::new("parent")
                .long("parent")
                .value_parser(value_parser!(u64))
                .help("Id of the parent unit."),
        );
}

fn subcommand_entity(
    name: &'static str,
    about: &'static str,
    extra_args: fn(Command) -> Command,
) -> Command {
    return Command::new(name)
        .about(about)
        .arg_required_else_help(true)
        .subcommand(list_args(
            Command::new("list").about("List entries with optional search, sort, and paging."),
        ))
        .subcommand(extra_args(draft_args(
            Command::new("create").about("Create a new entry."),
        )))
        .subcommand(extra_args(draft_args(
            Command::new("update")
                .about("Update an entry by id.")
                .arg(arg_id()),
        )))
        .subcommand(
            Command::new("delete")
                .about("Delete an entry by id.")
                .arg(arg_id()),
        );
}

fn subcommand_profile() -> Command {
    return Command::new("profile")
        .about("Show and edit the signed-in user's profile.")
        .arg_required_else_help(true)
        .subcommand(Command::new("show").about("Show the profile."))
        .subcommand(
            Command::new("update")
                .about("Update profile fields.")
                .arg(Arg::new("name").long("name").required(true).help("Full name."))
                .arg(Arg::new("cpf").long("cpf").num_args(1).help("CPF document number."))
                .arg(
                    Arg::new("birth-date")
                        .long("birth-date")
                        .num_args(1)
                        .help("Birth date, YYYY-MM-DD."),
                )
                .arg(Arg::new("phone").long("phone").num_args(1).help("Phone number."))
                .arg(
                    Arg::new("whatsapp")
                        .long("whatsapp")
                        .num_args(1)
                        .help("WhatsApp number."),
                ),
        )
        .subcommand(Command::new("passwd").about("Change the account password."));
}

pub fn build() -> Command {
    let about = format!(
        "{}\n\nVersion: {}",
        env!("CARGO_PKG_DESCRIPTION"),
        env!("CARGO_PKG_VERSION"),
    );

    return Command::new("gatehouse")
        .about(about)
        .version(env!("CARGO_PKG_VERSION"))
        .arg_required_else_help(true)
        .subcommand(
            Command::new("login")
                .about("Sign in and store the session credential.")
                .arg(
                    Arg::new("email")
                        .long("email")
                        .short('u')
                        .required(true)
                        .help("Account email."),
                )
                .arg(
                    Arg::new("password")
                        .long("password")
                        .num_args(1)
                        .help("Account password. Prompted for when omitted."),
                ),
        )
        .subcommand(Command::new("logout").about("Sign out and clear the stored credentials."))
        .subcommand(Command::new("whoami").about("Show the signed-in user."))
        .subcommand(subcommand_profile())
        .subcommand(subcommand_entity(
            "roles",
            "Manage roles.",
            no_extra_args,
        ))
        .subcommand(subcommand_entity(
            "positions",
            "Manage positions.",
            position_args,
        ))
        .subcommand(subcommand_entity(
            "org-units",
            "Manage organizational units.",
            org_unit_args,
        ))
        .subcommand(subcommand_entity(
            "location-types",
            "Manage location types.",
            no_extra_args,
        ))
        .subcommand(subcommand_completions())
        .subcommand(subcommand_config())
        .subcommand(Command::new("manpages").about("Generates manpages and outputs to stdout."))
        .arg(
            Arg::new(ConfigKey::ApiURL.to_string())
                .long(ConfigKey::ApiURL.to_string())
                .env("GATEHOUSE_API_URL")
                .num_args(1)
                .help(format!(
                    "Base URL of the SSO admin API. [default: {}]",
                    Config::default(ConfigKey::ApiURL)
                ))
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::ConfigFile.to_string())
                .short('c')
                .long(ConfigKey::ConfigFile.to_string())
                .env("GATEHOUSE_CONFIG_FILE")
                .num_args(1)
                .help(format!(
                    "Path to configuration file [default: {}]",
                    Config::default(ConfigKey::ConfigFile)
                ))
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::CredentialsFile.to_string())
                .long(ConfigKey::CredentialsFile.to_string())
                .env("GATEHOUSE_CREDENTIALS_FILE")
                .num_args(1)
                .help(format!(
                    "Path to the stored credential pair. [default: {}]",
                    Config::default(ConfigKey::CredentialsFile)
                ))
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::PageSize.to_string())
                .long(ConfigKey::PageSize.to_string())
                .env("GATEHOUSE_PAGE_SIZE")
                .num_args(1)
                .help(format!(
                    "Rows requested per page on list screens. [default: {}]",
                    Config::default(ConfigKey::PageSize)
                ))
                .global(true),
        )
        .arg(
            Arg::new(ConfigKey::RequestTimeout.to_string())
                .long(ConfigKey::RequestTimeout.to_string())
                .env("GATEHOUSE_REQUEST_TIMEOUT")
                .num_args(1)
                .help(format!(
                    "Time in milliseconds before a request times out. [default: {}]",
                    Config::default(ConfigKey::RequestTimeout)
                ))
                .global(true),
        );
}

trait FromArgs {
    fn from_args(matches: &ArgMatches) -> Self;
}

impl FromArgs for RoleDraft {
    fn from_args(matches: &ArgMatches) -> RoleDraft {
        return RoleDraft {
            name: matches.get_one::<String>("name").unwrap().to_string(),
            description: matches
                .get_one::<String>("description")
                .unwrap()
                .to_string(),
        };
    }
}

impl FromArgs for PositionDraft {
    fn from_args(matches: &ArgMatches) -> PositionDraft {
        return PositionDraft {
            name: matches.get_one::<String>("name").unwrap().to_string(),
            description: matches
                .get_one::<String>("description")
                .unwrap()
                .to_string(),
            organizational_unit_id: matches.get_one::<u64>("org-unit").copied(),
        };
    }
}

impl FromArgs for OrgUnitDraft {
    fn from_args(matches: &ArgMatches) -> OrgUnitDraft {
        return OrgUnitDraft {
            name: matches.get_one::<String>("name").unwrap().to_string(),
            description: matches
                .get_one::<String>("description")
                .unwrap()
                .to_string(),
            location_type_id: matches.get_one::<u64>("location-type").copied(),
            parent_id: matches.get_one::<u64>("parent").copied(),
        };
    }
}

impl FromArgs for LocationTypeDraft {
    fn from_args(matches: &ArgMatches) -> LocationTypeDraft {
        return LocationTypeDraft {
            name: matches.get_one::<String>("name").unwrap().to_string(),
            description: matches
                .get_one::<String>("description")
                .unwrap()
                .to_string(),
        };
    }
}

async fn authenticated_session() -> Result<SessionManager> {
    let mut session = SessionManager::default();
    if session.bootstrap().await? != SessionStatus::Authenticated {
        bail!("You are not signed in. Run `gatehouse login` first.");
    }
    return Ok(session);
}

fn print_field_errors(errors: &FieldErrors) {
    for (field, messages) in &errors.fields {
        for message in messages {
            eprintln!("{}", Paint::red(format!("{field}: {message}")));
        }
    }
    for message in &errors.general {
        eprintln!("{}", Paint::red(message));
    }
}

/// Prints collected notices, and turns an expiry signal into the forced
/// logout: storage is cleared and the command fails with the re-login
/// instruction, no matter which screen raised it.
async fn drain_events(
    rx: &mut mpsc::UnboundedReceiver<Event>,
    session: &mut SessionManager,
) -> Result<()> {
    let mut expired = false;
    while let Ok(event) = rx.try_recv() {
        match event {
            Event::Notice(notice) => match notice.level {
                NoticeLevel::Success => println!("{}", Paint::green(notice.message)),
                NoticeLevel::Error => eprintln!("{}", Paint::red(notice.message)),
            },
            Event::SessionExpired => expired = true,
        }
    }

    if expired {
        session.expire().await?;
        bail!("Your session has expired. Run `gatehouse login` to sign in again.");
    }

    return Ok(());
}

async fn run_entity<R: Resource>(matches: &ArgMatches) -> Result<()>
where
    R::Draft: FromArgs,
{
    let mut session = authenticated_session().await?;
    let api: ApiBox = Box::new(HttpApi::default());
    let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
    let page_size = Config::get(ConfigKey::PageSize).parse::<u32>()?;
    let mut list = ListQuery::<R>::new(
        session.credential().unwrap().to_string(),
        page_size,
        tx,
    );

    let mut invalid: Option<FieldErrors> = None;

    match matches.subcommand() {
        Some(("list", list_matches)) => {
            if let Some(search) = list_matches.get_one::<String>("search") {
                list.set_filter(Some(search.to_string()));
            }
            if let Some(field) = list_matches.get_one::<String>("sort-by") {
                let direction = list_matches
                    .get_one::<String>("order")
                    .and_then(|e| return SortDirection::parse(e))
                    .unwrap_or(SortDirection::Asc);
                list.set_sort(field, direction);
            }

            list.refresh(&api).await?;

            let page = *list_matches.get_one::<u32>("page").unwrap();
            if page > 1 {
                if !list.go_to_page(page) {
                    eprintln!("{}", Paint::yellow(format!("Page {page} is out of range.")));
                } else {
                    list.refresh(&api).await?;
                }
            }

            for item in list.items() {
                println!("{}", item.summary());
            }
            if let Some(pagination) = list.pagination() {
                println!(
                    "Page {}/{} ({} total)",
                    pagination.current_page, pagination.total_pages, pagination.total_count
                );
            }
        }
        Some(("create", create_matches)) => {
            let draft = R::Draft::from_args(create_matches);
            if let MutationOutcome::Invalid(errors) = list.create(&api, &draft).await? {
                invalid = Some(errors);
            }
        }
        Some(("update", update_matches)) => {
            let id = *update_matches.get_one::<u64>("id").unwrap();
            let draft = R::Draft::from_args(update_matches);
            if let MutationOutcome::Invalid(errors) = list.update(&api, id, &draft).await? {
                invalid = Some(errors);
            }
        }
        Some(("delete", delete_matches)) => {
            let id = *delete_matches.get_one::<u64>("id").unwrap();
            list.delete(&api, id).await?;
        }
        _ => {}
    }

    drain_events(&mut rx, &mut session).await?;

    if let Some(errors) = invalid {
        print_field_errors(&errors);
        bail!("Validation failed, nothing was saved.");
    }

    return Ok(());
}

async fn run_profile(matches: &ArgMatches) -> Result<()> {
    let mut session = authenticated_session().await?;
    let api: ApiBox = Box::new(HttpApi::default());
    let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
    let profile = ProfileService::new(session.credential().unwrap().to_string(), tx);

    let mut invalid: Option<FieldErrors> = None;

    match matches.subcommand() {
        Some(("show", _)) => {
            if let Some(user) = profile.fetch(&api).await? {
                println!("{} <{}>", user.name, user.email);
                if !user.active_roles.is_empty() {
                    let roles = user
                        .active_roles
                        .iter()
                        .map(|role| return role.name.to_string())
                        .collect::<Vec<String>>();
                    println!("Roles: {}", roles.join(", "));
                }
                for position in &user.active_positions {
                    println!(
                        "Position: {} ({})",
                        position.position_name, position.organizational_unit_name
                    );
                }
            }
        }
        Some(("update", update_matches)) => {
            let draft = ProfileDraft {
                name: update_matches.get_one::<String>("name").unwrap().to_string(),
                cpf: update_matches.get_one::<String>("cpf").cloned(),
                birth_date: update_matches.get_one::<String>("birth-date").cloned(),
                phone: update_matches.get_one::<String>("phone").cloned(),
                whatsapp: update_matches.get_one::<String>("whatsapp").cloned(),
            };
            if let MutationOutcome::Invalid(errors) = profile.update(&api, &draft).await? {
                invalid = Some(errors);
            }
        }
        Some(("passwd", _)) => {
            let change = PasswordChange {
                current_password: Password::with_theme(&ColorfulTheme::default())
                    .with_prompt("Current password")
                    .interact()?,
                new_password: Password::with_theme(&ColorfulTheme::default())
                    .with_prompt("New password")
                    .interact()?,
                new_password_confirmation: Password::with_theme(&ColorfulTheme::default())
                    .with_prompt("Confirm new password")
                    .interact()?,
            };
            if let MutationOutcome::Invalid(errors) =
                profile.change_password(&api, &change).await?
            {
                invalid = Some(errors);
            }
        }
        _ => {}
    }

    drain_events(&mut rx, &mut session).await?;

    if let Some(errors) = invalid {
        print_field_errors(&errors);
        bail!("Validation failed, nothing was saved.");
    }

    return Ok(());
}

pub async fn parse() -> Result<()> {
    let matches = build().get_matches();

    match matches.subcommand() {
        Some(("completions", subcmd_matches)) => {
            if let Some(completions) = subcmd_matches.get_one::<Shell>("shell").copied() {
                let mut app = build();
                print_completions(completions, &mut app);
            }
        }
        Some(("manpages", _)) => {
            clap_mangen::Man::new(build()).render(&mut io::stdout())?;
        }
        Some(("config", subcmd_matches)) => match subcmd_matches.subcommand() {
            Some(("create", _)) => {
                create_config_file().await?;
            }
            Some(("default", _)) => {
                println!("{}", Config::serialize_default(build()));
            }
            Some(("path", _)) => {
                println!("{}", Config::default(ConfigKey::ConfigFile));
            }
            _ => {
                subcommand_config().print_long_help()?;
            }
        },
        Some(("login", subcmd_matches)) => {
            Config::load(build(), vec![&matches, subcmd_matches]).await?;

            let email = subcmd_matches.get_one::<String>("email").unwrap();
            let password = match subcmd_matches.get_one::<String>("password") {
                Some(password) => password.to_string(),
                None => Password::with_theme(&ColorfulTheme::default())
                    .with_prompt("Password")
                    .interact()?,
            };

            let api: ApiBox = Box::new(HttpApi::default());
            let mut session = SessionManager::default();
            let user = session.login(&api, email, &password).await?;
            println!(
                "{}",
                Paint::green(format!("Signed in as {} <{}>", user.name, user.email))
            );
        }
        Some(("logout", subcmd_matches)) => {
            Config::load(build(), vec![&matches, subcmd_matches]).await?;
            let mut session = SessionManager::default();
            session.logout().await?;
            println!("Signed out.");
        }
        Some(("whoami", subcmd_matches)) => {
            Config::load(build(), vec![&matches, subcmd_matches]).await?;
            let session = authenticated_session().await?;
            let user = session.current_user().unwrap();
            println!("{} <{}>", user.name, user.email);
            if !user.active_roles.is_empty() {
                println!("Roles: {}", user.active_roles.join(", "));
            }
        }
        Some(("profile", subcmd_matches)) => {
            Config::load(build(), vec![&matches, subcmd_matches]).await?;
            run_profile(subcmd_matches).await?;
        }
        Some(("roles", subcmd_matches)) => {
            Config::load(build(), vec![&matches, subcmd_matches]).await?;
            run_entity::<Role>(subcmd_matches).await?;
        }
        Some(("positions", subcmd_matches)) => {
            Config::load(build(), vec![&matches, subcmd_matches]).await?;
            run_entity::<Position>(subcmd_matches).await?;
        }
        Some(("org-units", subcmd_matches)) => {
            Config::load(build(), vec![&matches, subcmd_matches]).await?;
            run_entity::<OrgUnit>(subcmd_matches).await?;
        }
        Some(("location-types", subcmd_matches)) => {
            Config::load(build(), vec![&matches, subcmd_matches]).await?;
            run_entity::<LocationType>(subcmd_matches).await?;
        }
        _ => {
            build().print_long_help()?;
        }
    }

    return Ok(());
}
