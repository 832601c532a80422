use anyhow::{Context, Result, anyhow, bail};
use midiport_endpoint::{Endpoint, Session, discovery};
use midiport_native::packet::TimestampConvention;
use midiport_types::endpoint_type::EndpointType;
use midiport_types::info::EndpointInfo;

const HEX_PREFIX: &str = "0x";
const HEX_RADIX: u32 = 16;

#[cfg(target_os = "macos")]
pub fn open_session(convention: Option<TimestampConvention>) -> Result<Session> {
    let session = Session::core_midi();
    Ok(match convention {
        Some(convention) => Session::with_convention(session.host().clone(), convention),
        None => session,
    })
}

#[cfg(not(target_os = "macos"))]
pub fn open_session(_convention: Option<TimestampConvention>) -> Result<Session> {
    Err(anyhow!("open_session(): CoreMIDI is only available on macOS"))
}

pub fn list(session: &Session, endpoint_type: Option<EndpointType>, json: bool) -> Result<()> {
    let endpoints = match endpoint_type {
        Some(endpoint_type) => discovery::all_of_type(session, endpoint_type),
        None => discovery::all(session),
    };
    log::debug!("list(): Found {} endpoints", endpoints.len());

    let infos: Vec<EndpointInfo> = endpoints.iter().map(Endpoint::info).collect();
    if json {
        println!("{}", serde_json::to_string_pretty(&infos)?);
    } else {
        for info in &infos {
            println!("{}", format_info(info));
        }
    }
    Ok(())
}

pub fn show(session: &Session, id: u32, json: bool) -> Result<()> {
    let endpoint = discovery::find_by_id(session, id)
        .ok_or_else(|| anyhow!("show(): No endpoint with id {id}"))?;

    let info = endpoint.info();
    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        println!("{}", format_info(&info));
    }
    Ok(())
}

pub fn send(session: &Session, id: u32, bytes: &[String]) -> Result<()> {
    let message = parse_message(bytes)?;
    let mut endpoint = discovery::find_by_id(session, id)
        .ok_or_else(|| anyhow!("send(): No endpoint with id {id}"))?;

    if endpoint.endpoint_type() != EndpointType::Output {
        bail!("send(): Endpoint {id} '{}' is not an output", endpoint.name());
    }
    if !endpoint.is_online() {
        log::warn!("send(): Endpoint {id} '{}' reports itself offline", endpoint.name());
    }

    endpoint
        .enable()
        .with_context(|| format!("send(): Could not enable endpoint {id}"))?;
    endpoint
        .send(&message)
        .with_context(|| format!("send(): Could not send to endpoint {id}"))?;
    endpoint.disable()?;

    log::info!("send(): Sent {} bytes to '{}'", message.len(), endpoint.name());
    Ok(())
}

fn format_info(info: &EndpointInfo) -> String {
    let id = info.id.map_or_else(|| "-".to_string(), |id| id.to_string());
    let state = if info.is_online { "online" } else { "offline" };
    let endpoint_type = info.endpoint_type.to_string();
    format!("{id:>3}  {endpoint_type:<6}  {state:<7}  {}", info.name)
}

fn parse_message(bytes: &[String]) -> Result<Vec<u8>> {
    bytes.iter().map(|byte| parse_hex_byte(byte)).collect()
}

fn parse_hex_byte(value: &str) -> Result<u8> {
    let digits = value
        .strip_prefix(HEX_PREFIX)
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    u8::from_str_radix(digits, HEX_RADIX)
        .with_context(|| format!("parse_hex_byte(): '{value}' is not a hex byte"))
}
