//! Subcommand definitions and their handlers.

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context as _, bail};
use clap::{Args, Subcommand};
use remotelabs_client::{
  ApiClient,
  actions::{InstanceActions, TemplateActions},
  creation::{SubjectCreation, SubjectForm},
  monitor::ServerMonitor,
  notify::RecordingNotifier,
  persist::FileSession,
  resources::{
    BasesResource, InstancesResource, SubjectMembers, SubjectsResource, TemplatesResource,
    UsersResource,
  },
  session::SessionService,
};
use remotelabs_core::{
  role::Capability,
  template::Resources,
  wire::{InstanceSource, NewUser, ProfileUpdate, TemplateDefinition, TemplateSource},
};
use uuid::Uuid;

use crate::{
  output::{print_list, print_notifications},
  settings::Settings,
};

// ─── Definitions ──────────────────────────────────────────────────────────────

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Log in and remember the session.
  Login {
    #[arg(long)]
    mail:     String,
    /// Prompted for when omitted.
    #[arg(long)]
    password: Option<String>,
  },
  /// Create a student account. It must be verified before logging in.
  Register {
    #[arg(long)]
    name:     String,
    #[arg(long)]
    mail:     String,
    #[arg(long)]
    password: Option<String>,
  },
  /// Forget the stored session.
  Logout,
  /// Show the logged-in user.
  Whoami,
  #[command(subcommand)]
  Account(AccountCommand),
  #[command(subcommand)]
  Subjects(SubjectsCommand),
  #[command(subcommand)]
  Members(MembersCommand),
  #[command(subcommand)]
  Templates(TemplatesCommand),
  #[command(subcommand)]
  Vms(VmsCommand),
  /// List base images.
  Bases,
  #[command(subcommand)]
  Users(UsersCommand),
  /// Show current server utilisation.
  Servers,
  /// Live fleet dashboard.
  Dashboard,
}

#[derive(Subcommand, Debug)]
pub enum AccountCommand {
  /// Confirm an e-mail address with the token from the verification mail.
  Verify { token: String },
  /// Ask for a password-reset mail.
  Forgot { mail: String },
  /// Set a new password with the token from the reset mail.
  Reset {
    token:    String,
    #[arg(long)]
    password: Option<String>,
  },
  /// Exchange a renewal token for a fresh session.
  Renew { token: String },
  /// Change name, password or SSH keys of the logged-in user.
  Update {
    #[arg(long)]
    name:     Option<String>,
    #[arg(long)]
    password: Option<String>,
    /// Replaces every stored key. Repeat for several keys.
    #[arg(long = "ssh-key")]
    ssh_keys: Vec<String>,
  },
}

#[derive(Subcommand, Debug)]
pub enum SubjectsCommand {
  /// Subjects the logged-in user teaches or is enrolled in.
  List,
  /// Create a subject, enroll its members and define its first template.
  Create(CreateSubjectArgs),
  Delete { id: Uuid },
}

#[derive(Args, Debug)]
pub struct CreateSubjectArgs {
  #[arg(long)]
  name:        String,
  #[arg(long)]
  code:        String,
  /// The first professor owns the subject. Repeatable.
  #[arg(long = "professor", required = true)]
  professors:  Vec<String>,
  /// Repeatable.
  #[arg(long = "student")]
  students:    Vec<String>,
  #[arg(long)]
  base:        String,
  #[command(flatten)]
  resources:   ResourceArgs,
  /// Boot a VM to customise before it becomes the template.
  #[arg(long)]
  customize:   bool,
  #[arg(long, default_value = "")]
  description: String,
}

#[derive(Args, Debug)]
pub struct ResourceArgs {
  /// RAM in GiB.
  #[arg(long, default_value = "2")]
  ram:     String,
  #[arg(long, default_value = "2")]
  cpu:     String,
  /// Disk in GiB.
  #[arg(long, default_value = "10")]
  storage: String,
}

impl ResourceArgs {
  fn parse(&self) -> anyhow::Result<Resources> {
    Ok(Resources::from_form(&self.ram, &self.cpu, &self.storage)?)
  }
}

#[derive(Subcommand, Debug)]
pub enum MembersCommand {
  List { subject: Uuid },
  Add { subject: Uuid, mail: String },
  Remove { subject: Uuid, mail: String },
}

#[derive(Subcommand, Debug)]
pub enum TemplatesCommand {
  List {
    subject: Uuid,
  },
  /// Define a template from a base image or an existing instance.
  Define {
    #[arg(long)]
    subject:     Uuid,
    #[arg(long, conflicts_with = "instance", required_unless_present = "instance")]
    base:        Option<String>,
    #[arg(long)]
    instance:    Option<Uuid>,
    #[arg(long)]
    description: String,
    #[command(flatten)]
    resources:   ResourceArgs,
  },
  Delete {
    subject:  Uuid,
    template: Uuid,
  },
}

#[derive(Subcommand, Debug)]
pub enum VmsCommand {
  /// The logged-in user's instances.
  List,
  /// Create a VM straight from a base image.
  Create {
    #[arg(long)]
    subject:   Uuid,
    #[arg(long)]
    base:      String,
    #[command(flatten)]
    resources: ResourceArgs,
  },
  /// Request a lab VM from one of a subject's templates.
  Request {
    #[arg(long)]
    subject:  Uuid,
    #[arg(long)]
    template: Uuid,
  },
  Start {
    id: Uuid,
  },
  Stop {
    id: Uuid,
  },
  Delete {
    id: Uuid,
  },
  /// Print or save the instance's WireGuard client configuration.
  Wireguard {
    id:  Uuid,
    #[arg(long, value_name = "FILE")]
    out: Option<PathBuf>,
  },
}

#[derive(Subcommand, Debug)]
pub enum UsersCommand {
  List,
  Delete {
    id: Uuid,
  },
  CreateProfessor {
    #[arg(long)]
    name:     String,
    #[arg(long)]
    mail:     String,
    #[arg(long)]
    password: Option<String>,
  },
}

// ─── Context ──────────────────────────────────────────────────────────────────

/// Everything a handler needs: the restored session and a notifier whose
/// messages are printed once the command finishes.
pub struct Context {
  pub settings: Settings,
  pub session:  SessionService<FileSession>,
  pub notifier: RecordingNotifier,
}

impl Context {
  pub async fn open(settings: Settings) -> anyhow::Result<Self> {
    let mut config = remotelabs_client::ApiConfig::new(&settings.api_url);
    config.timeout = settings.timeout();
    let client = ApiClient::new(config).context("building HTTP client")?;
    let mut session = SessionService::new(client, FileSession::new(&settings.session_file));
    session.init().await;
    Ok(Self { settings, session, notifier: RecordingNotifier::new() })
  }

  fn client(&self) -> ApiClient { self.session.client().clone() }

  fn instance_actions(&self) -> InstanceActions {
    InstanceActions::new(self.client(), Arc::new(self.notifier.clone()))
  }

  fn template_actions(&self) -> TemplateActions {
    TemplateActions::new(self.client(), Arc::new(self.notifier.clone()))
  }

  fn flush(&self) { print_notifications(self.notifier.take()); }
}

/// Read a password from stdin when it was not given as a flag.
fn password_or_prompt(password: Option<String>) -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  if let Some(p) = password {
    return Ok(p);
  }
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line).context("reading password")?;
  Ok(line.trim_end_matches(['\n', '\r']).to_owned())
}

// ─── Dispatch ─────────────────────────────────────────────────────────────────

pub async fn run(ctx: &mut Context, command: Command) -> anyhow::Result<()> {
  let result = dispatch(ctx, command).await;
  ctx.flush();
  result
}

async fn dispatch(ctx: &mut Context, command: Command) -> anyhow::Result<()> {
  match command {
    Command::Login { mail, password } => {
      let password = password_or_prompt(password)?;
      ctx.session.login(&mail, &password).await?;
      let user = ctx.session.current_user()?;
      println!("Logged in as {} ({})", user.name, user.role);
    }
    Command::Register { name, mail, password } => {
      let password = password_or_prompt(password)?;
      let id = ctx.session.register(&name, &mail, &password).await?;
      println!("Account {id} created; check {mail} for the verification link.");
    }
    Command::Logout => {
      ctx.session.logout()?;
      println!("Logged out.");
    }
    Command::Whoami => {
      let user = ctx.session.current_user()?;
      print_list(std::slice::from_ref(user));
    }
    Command::Account(cmd) => account(ctx, cmd).await?,
    Command::Subjects(cmd) => subjects(ctx, cmd).await?,
    Command::Members(cmd) => members(ctx, cmd).await?,
    Command::Templates(cmd) => templates(ctx, cmd).await?,
    Command::Vms(cmd) => vms(ctx, cmd).await?,
    Command::Bases => {
      ctx.session.current_user()?;
      let bases = BasesResource::new(ctx.client());
      bases.fetch().await?;
      print_list(&bases.items());
    }
    Command::Users(cmd) => users(ctx, cmd).await?,
    Command::Servers => {
      ctx.session.require(Capability::ViewFleetStatus)?;
      let mut monitor = ServerMonitor::new(ctx.client(), 1);
      monitor.poll().await?;
      print_list(&monitor.view().servers);
    }
    Command::Dashboard => {
      ctx.session.require(Capability::ViewFleetStatus)?;
      let monitor = ServerMonitor::new(ctx.client(), ctx.settings.history_len)
        .spawn(ctx.settings.poll_interval());
      crate::app::run(monitor, &ctx.settings.api_url).await?;
    }
  }
  Ok(())
}

async fn account(ctx: &mut Context, cmd: AccountCommand) -> anyhow::Result<()> {
  match cmd {
    AccountCommand::Verify { token } => {
      ctx.session.verify_email(&token).await?;
      println!("Address verified; you can log in now.");
    }
    AccountCommand::Forgot { mail } => {
      ctx.session.forgot_password(&mail).await?;
      println!("If {mail} has an account, a reset link is on its way.");
    }
    AccountCommand::Reset { token, password } => {
      let password = password_or_prompt(password)?;
      ctx.session.reset_password(&token, &password).await?;
      println!("Password changed.");
    }
    AccountCommand::Renew { token } => {
      ctx.session.renew_session(&token).await?;
      println!("Session renewed.");
    }
    AccountCommand::Update { name, password, ssh_keys } => {
      let update = ProfileUpdate {
        name,
        password,
        ssh_keys: (!ssh_keys.is_empty()).then_some(ssh_keys),
        ..ProfileUpdate::default()
      };
      let user = ctx.session.update_profile(update).await?;
      print_list(std::slice::from_ref(user));
    }
  }
  Ok(())
}

async fn subjects(ctx: &mut Context, cmd: SubjectsCommand) -> anyhow::Result<()> {
  match cmd {
    SubjectsCommand::List => {
      let user = ctx.session.current_user()?;
      let list = SubjectsResource::new(ctx.client(), user.id);
      list.fetch().await?;
      print_list(&list.items());
    }
    SubjectsCommand::Create(args) => {
      let actor = ctx.session.require(Capability::ManageSubjects)?.clone();
      let mut form = SubjectForm {
        name:             args.name,
        code:             args.code,
        professor_emails: args.professors,
        student_emails:   args.students,
        base_id:          args.base,
        vm_ram:           args.resources.ram,
        vm_cpu:           args.resources.cpu,
        vm_storage:       args.resources.storage,
        customize_vm:     args.customize,
        description:      args.description,
      };
      let mut creation = SubjectCreation::new(ctx.client(), Arc::new(ctx.notifier.clone()));
      let created = creation.run(&actor, &mut form).await?;
      println!("subject  {}", created.subject_id);
      println!("template {}", created.template_id);
      if let Some(vm) = created.instance_id {
        println!("vm       {vm}  (customise it, then define further templates from it)");
      }
    }
    SubjectsCommand::Delete { id } => {
      let user = ctx.session.require(Capability::ManageSubjects)?;
      let list = SubjectsResource::new(ctx.client(), user.id);
      list.delete_subject(id).await?;
      println!("Subject {id} deleted.");
    }
  }
  Ok(())
}

async fn members(ctx: &mut Context, cmd: MembersCommand) -> anyhow::Result<()> {
  match cmd {
    MembersCommand::List { subject } => {
      ctx.session.current_user()?;
      let members = SubjectMembers::new(ctx.client(), subject);
      members.fetch().await?;
      print_list(&members.items());
    }
    MembersCommand::Add { subject, mail } => {
      ctx.session.require(Capability::ManageSubjects)?;
      let members = SubjectMembers::new(ctx.client(), subject);
      members.add_user(&mail).await?;
      print_list(&members.items());
    }
    MembersCommand::Remove { subject, mail } => {
      let actor = ctx.session.require(Capability::ManageSubjects)?;
      let members = SubjectMembers::new(ctx.client(), subject);
      members.remove_user(actor, &mail).await?;
      print_list(&members.items());
    }
  }
  Ok(())
}

async fn templates(ctx: &mut Context, cmd: TemplatesCommand) -> anyhow::Result<()> {
  match cmd {
    TemplatesCommand::List { subject } => {
      ctx.session.current_user()?;
      let list = TemplatesResource::new(ctx.client(), subject);
      list.fetch().await?;
      print_list(&list.items());
    }
    TemplatesCommand::Define { subject, base, instance, description, resources } => {
      let actor = ctx.session.current_user()?;
      let source = match (instance, base) {
        (Some(id), _) => TemplateSource::Instance(id),
        (None, Some(base)) => TemplateSource::Base(base),
        (None, None) => bail!("either --base or --instance is required"),
      };
      let def = TemplateDefinition {
        source,
        subject_id: subject,
        description,
        is_validated: true,
        resources: resources.parse()?,
      };
      let created = ctx.template_actions().define_template(actor, &def).await?;
      println!("{}", created.id);
    }
    TemplatesCommand::Delete { subject, template } => {
      ctx.session.require(Capability::DefineTemplates)?;
      let list = TemplatesResource::new(ctx.client(), subject);
      list.delete_template(template).await?;
      println!("Template {template} deleted.");
    }
  }
  Ok(())
}

async fn vms(ctx: &mut Context, cmd: VmsCommand) -> anyhow::Result<()> {
  let user = ctx.session.current_user()?.clone();
  let actions = ctx.instance_actions();
  match cmd {
    VmsCommand::List => {
      let list = InstancesResource::new(ctx.client(), user.id);
      list.fetch().await?;
      print_list(&list.items());
    }
    VmsCommand::Create { subject, base, resources } => {
      let resources = resources.parse()?;
      let created = actions
        .create_instance(Some(&user), subject, InstanceSource::Base(base), Some(resources))
        .await?;
      println!("{}", created.id);
    }
    VmsCommand::Request { subject, template } => {
      let created = actions.request_lab(Some(&user), subject, template).await?;
      println!("{}", created.id);
    }
    VmsCommand::Start { id } => {
      let owned = InstancesResource::new(ctx.client(), user.id);
      owned.fetch().await?;
      actions.start_vm(&user, id, &owned.items()).await?;
    }
    VmsCommand::Stop { id } => actions.stop_vm(id).await?,
    VmsCommand::Delete { id } => actions.delete_vm(id).await?,
    VmsCommand::Wireguard { id, out } => {
      let config = actions.wireguard_config(id).await?;
      match out {
        Some(path) => {
          std::fs::write(&path, config)
            .with_context(|| format!("writing {}", path.display()))?;
          println!("Saved to {}", path.display());
        }
        None => print!("{config}"),
      }
    }
  }
  Ok(())
}

async fn users(ctx: &mut Context, cmd: UsersCommand) -> anyhow::Result<()> {
  match cmd {
    UsersCommand::List => {
      ctx.session.require(Capability::ManageUsers)?;
      let users = UsersResource::new(ctx.client());
      users.fetch().await?;
      print_list(&users.items());
    }
    UsersCommand::Delete { id } => {
      let actor = ctx.session.require(Capability::ManageUsers)?;
      if actor.id == id {
        bail!("refusing to delete the logged-in account");
      }
      let users = UsersResource::new(ctx.client());
      users.delete_user(id).await?;
      println!("User {id} deleted.");
    }
    UsersCommand::CreateProfessor { name, mail, password } => {
      ctx.session.require(Capability::CreateProfessors)?;
      let password = password_or_prompt(password)?;
      let users = UsersResource::new(ctx.client());
      let created = users.create_professor(&NewUser { name, mail, password }).await?;
      println!("{}", created.id);
    }
  }
  Ok(())
}
