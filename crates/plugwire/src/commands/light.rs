//! Light command handler.

use plugwire_core::model::{LightState, LightStateInput};

use crate::cli::LightArgs;
use crate::error::CliError;
use crate::output;

use super::{Context, util};

pub async fn handle(ctx: &Context<'_>, args: LightArgs) -> Result<(), CliError> {
    let device = util::fetch_device(ctx, &args.target).await?;
    let light = device.as_light()?;

    let state = match build_input(&args) {
        None => light.get_light_state(ctx.send()).await?,
        Some(input) => {
            if (input.hue.is_some() || input.saturation.is_some()) && !light.is_color() {
                return Err(CliError::Unsupported {
                    operation: "color".into(),
                    required: "a color bulb".into(),
                });
            }
            if input.color_temp.is_some_and(|t| t > 0) && !light.is_variable_color_temp() {
                return Err(CliError::Unsupported {
                    operation: "color temperature".into(),
                    required: "a tunable white bulb".into(),
                });
            }
            if input.brightness.is_some() && !light.is_dimmable() {
                return Err(CliError::Unsupported {
                    operation: "brightness".into(),
                    required: "a dimmable bulb".into(),
                });
            }
            light.set_light_state(&input, ctx.send()).await?
        }
    };

    let out = output::render_single(
        ctx.format,
        &state,
        |s| state_detail(s, ctx.color),
        |s| if s.is_on() { "on".into() } else { "off".into() },
    );
    ctx.print(&out);
    Ok(())
}

/// `None` when no change was requested.
fn build_input(args: &LightArgs) -> Option<LightStateInput> {
    let on_off = match (args.on, args.off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    };
    let input = LightStateInput {
        transition_period: args.transition,
        on_off,
        hue: args.hue,
        saturation: args.saturation,
        brightness: args.brightness,
        color_temp: args.color_temp,
        ..LightStateInput::default()
    };

    let changes = input.on_off.is_some()
        || input.hue.is_some()
        || input.saturation.is_some()
        || input.brightness.is_some()
        || input.color_temp.is_some();
    changes.then_some(input)
}

fn state_detail(s: &LightState, color: bool) -> String {
    let mut lines = vec![format!("Power:    {}", output::paint_power(Some(s.is_on()), color))];
    if let Some(mode) = &s.mode {
        lines.push(format!("Mode:     {mode}"));
    }
    if let Some(b) = s.brightness {
        lines.push(format!("Bright:   {b}%"));
    }
    if let Some(h) = s.hue {
        lines.push(format!("Hue:      {h}"));
    }
    if let Some(sat) = s.saturation {
        lines.push(format!("Sat:      {sat}%"));
    }
    if let Some(t) = s.color_temp {
        lines.push(format!("ColorTmp: {t}K"));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::TargetArgs;

    fn args() -> LightArgs {
        LightArgs {
            target: TargetArgs {
                target: "lamp".into(),
                port: None,
                child: None,
            },
            on: false,
            off: false,
            brightness: None,
            hue: None,
            saturation: None,
            color_temp: None,
            transition: None,
        }
    }

    #[test]
    fn no_flags_means_read_only() {
        assert!(build_input(&args()).is_none());

        // A transition alone changes nothing.
        let mut a = args();
        a.transition = Some(500);
        assert!(build_input(&a).is_none());
    }

    #[test]
    fn flags_map_onto_input() {
        let mut a = args();
        a.off = true;
        a.brightness = Some(40);
        a.transition = Some(250);
        let input = build_input(&a);
        assert_eq!(
            input,
            Some(LightStateInput {
                on_off: Some(false),
                brightness: Some(40),
                transition_period: Some(250),
                ..LightStateInput::default()
            })
        );
    }
}
