use anyhow::Result;
use serenity::{
    builder::{
        CreateCommand, CreateCommandOption, CreateInteractionResponse,
        CreateInteractionResponseMessage,
    },
    model::{
        application::{CommandDataOption, CommandInteraction, CommandOptionType},
        id::GuildId,
    },
    prelude::Context,
};
use tracing::info;

use crate::audio::{PlayerRegistry, Volume};

pub const VOLUME: &str = "volume";

/// Registers the commands globally.
pub async fn register_global_commands(ctx: &Context) -> Result<()> {
    for command in commands() {
        ctx.http.create_global_command(&command).await?;
    }

    Ok(())
}

/// Registers the commands for a single guild. Propagates immediately, handy in development.
pub async fn register_guild_commands(ctx: &Context, guild_id: GuildId) -> Result<()> {
    guild_id.set_commands(&ctx.http, commands()).await?;

    Ok(())
}

fn commands() -> Vec<CreateCommand> {
    vec![volume_command()]
}

fn volume_command() -> CreateCommand {
    CreateCommand::new(VOLUME)
        .description("Set the volume")
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::Integer,
                VOLUME,
                "New volume (0-100) (Default: 20)",
            )
            .required(false),
        )
}

/// Requested volume; a missing option means the default.
fn requested_volume(options: &[CommandDataOption]) -> i64 {
    options
        .iter()
        .find(|opt| opt.name == VOLUME)
        .and_then(|opt| opt.value.as_i64())
        .unwrap_or_else(|| i64::from(Volume::DEFAULT.percent()))
}

fn volume_reply(volume: Volume) -> String {
    format!("🔊 Volume set to {}\n`{}`", volume, volume.bar())
}

pub async fn handle_volume(
    ctx: &Context,
    command: &CommandInteraction,
    registry: &PlayerRegistry,
) -> Result<()> {
    let Some(guild_id) = command.guild_id else {
        anyhow::bail!("/volume used outside a guild");
    };

    let requested = requested_volume(&command.data.options);
    let volume = registry.get_or_create(guild_id).set_volume(requested).await;
    info!(
        "🔊 {} set volume to {} in guild {}",
        command.user.name, volume, guild_id
    );

    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .content(volume_reply(volume)),
            ),
        )
        .await?;

    Ok(())
}
