//! Launchpad driver over midir

use midir::{
    MidiInput, MidiInputConnection, MidiInputPort, MidiOutput, MidiOutputConnection,
    MidiOutputPort,
};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{DeviceConnection, DeviceError, DeviceEvent, INBOUND_CAPACITY};
use crate::midi::{format_hex, WireEvent};

const CLIENT_NAME: &str = "Padshell";

/// MIDI connection to a Launchpad (input and output share a port name)
pub struct LaunchpadDevice {
    input_conn: Mutex<Option<MidiInputConnection<()>>>,
    output_conn: Mutex<Option<MidiOutputConnection>>,
    port_name: Mutex<Option<String>>,
}

// midir connections are only touched behind the mutexes above
unsafe impl Send for LaunchpadDevice {}
unsafe impl Sync for LaunchpadDevice {}

impl LaunchpadDevice {
    pub fn new() -> Self {
        Self {
            input_conn: Mutex::new(None),
            output_conn: Mutex::new(None),
            port_name: Mutex::new(None),
        }
    }

    /// Name of the connected port
    pub fn port_name(&self) -> Option<String> {
        self.port_name.lock().clone()
    }

    /// Find an input port by case-insensitive substring match
    fn find_input_port(midi_in: &MidiInput, pattern: &str) -> Option<(MidiInputPort, String)> {
        let pattern = pattern.to_lowercase();
        for port in midi_in.ports() {
            if let Ok(name) = midi_in.port_name(&port) {
                if name.to_lowercase().contains(&pattern) {
                    debug!("Found input port '{}' matching '{}'", name, pattern);
                    return Some((port, name));
                }
            }
        }
        None
    }

    /// Find an output port by case-insensitive substring match
    fn find_output_port(midi_out: &MidiOutput, pattern: &str) -> Option<(MidiOutputPort, String)> {
        let pattern = pattern.to_lowercase();
        for port in midi_out.ports() {
            if let Ok(name) = midi_out.port_name(&port) {
                if name.to_lowercase().contains(&pattern) {
                    debug!("Found output port '{}' matching '{}'", name, pattern);
                    return Some((port, name));
                }
            }
        }
        None
    }
}

impl Default for LaunchpadDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceConnection for LaunchpadDevice {
    fn connect(&self, identifier: &str) -> Result<mpsc::Receiver<DeviceEvent>, DeviceError> {
        self.disconnect();

        info!("🔌 Connecting to Launchpad port '{}'", identifier);

        let midi_in = MidiInput::new(&format!("{}-Input", CLIENT_NAME))
            .map_err(|e| DeviceError::Backend(e.to_string()))?;
        debug!("Found {} MIDI input ports", midi_in.port_count());

        let (in_port, in_name) = Self::find_input_port(&midi_in, identifier)
            .ok_or_else(|| DeviceError::PortNotFound(identifier.to_string()))?;

        let midi_out = MidiOutput::new(&format!("{}-Output", CLIENT_NAME))
            .map_err(|e| DeviceError::Backend(e.to_string()))?;
        debug!("Found {} MIDI output ports", midi_out.port_count());

        let (out_port, out_name) = Self::find_output_port(&midi_out, identifier)
            .ok_or_else(|| DeviceError::PortNotFound(identifier.to_string()))?;

        let (event_tx, event_rx) = mpsc::channel(INBOUND_CAPACITY);

        info!("Connecting to input port: {}", in_name);
        let input_conn = midi_in
            .connect(
                &in_port,
                CLIENT_NAME,
                move |_timestamp, data, _| {
                    // Runs on the backend's thread: never block here
                    if event_tx.try_send(DeviceEvent::new(data)).is_err() {
                        warn!("Inbound queue full, dropping {}", format_hex(data));
                    }
                },
                (),
            )
            .map_err(|e| DeviceError::Backend(e.to_string()))?;

        info!("Connecting to output port: {}", out_name);
        let output_conn = midi_out
            .connect(&out_port, CLIENT_NAME)
            .map_err(|e| DeviceError::Backend(e.to_string()))?;

        *self.input_conn.lock() = Some(input_conn);
        *self.output_conn.lock() = Some(output_conn);
        *self.port_name.lock() = Some(in_name.clone());

        info!("✅ Connected to: {}", in_name);
        Ok(event_rx)
    }

    fn send(&self, event: &WireEvent) -> Result<(), DeviceError> {
        let mut output = self.output_conn.lock();
        let conn = output.as_mut().ok_or(DeviceError::NotConnected)?;

        let data = event.to_bytes();
        conn.send(&data)
            .map_err(|e| DeviceError::Send(e.to_string()))?;

        debug!("Sent: {} | {}", format_hex(&data), event);
        Ok(())
    }

    fn disconnect(&self) {
        let input = self.input_conn.lock().take();
        let output = self.output_conn.lock().take();
        let was_connected = input.is_some() || output.is_some();

        if let Some(conn) = input {
            conn.close();
        }
        if let Some(conn) = output {
            conn.close();
        }
        self.port_name.lock().take();

        if was_connected {
            info!("👋 MIDI connections closed");
        }
    }

    fn is_connected(&self) -> bool {
        self.input_conn.lock().is_some() && self.output_conn.lock().is_some()
    }
}

impl Drop for LaunchpadDevice {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Port discovery utilities
pub mod discovery {
    use super::*;
    use colored::*;

    /// Information about a MIDI port
    #[derive(Debug, Clone)]
    pub struct PortInfo {
        pub index: usize,
        pub name: String,
        pub is_virtual: bool,
    }

    fn is_virtual(name: &str) -> bool {
        name.contains("Virtual") || name.contains("loopMIDI") || name.contains("IAC")
    }

    pub fn discover_input_ports() -> Result<Vec<PortInfo>, DeviceError> {
        let midi_in = MidiInput::new(&format!("{}-Discovery", CLIENT_NAME))
            .map_err(|e| DeviceError::Backend(e.to_string()))?;

        Ok(midi_in
            .ports()
            .iter()
            .enumerate()
            .filter_map(|(index, port)| {
                midi_in.port_name(port).ok().map(|name| PortInfo {
                    index,
                    is_virtual: is_virtual(&name),
                    name,
                })
            })
            .collect())
    }

    pub fn discover_output_ports() -> Result<Vec<PortInfo>, DeviceError> {
        let midi_out = MidiOutput::new(&format!("{}-Discovery", CLIENT_NAME))
            .map_err(|e| DeviceError::Backend(e.to_string()))?;

        Ok(midi_out
            .ports()
            .iter()
            .enumerate()
            .filter_map(|(index, port)| {
                midi_out.port_name(port).ok().map(|name| PortInfo {
                    index,
                    is_virtual: is_virtual(&name),
                    name,
                })
            })
            .collect())
    }

    /// First input port whose name looks like a Launchpad
    pub fn find_launchpad_port() -> Option<String> {
        discover_input_ports()
            .ok()?
            .into_iter()
            .find(|p| p.name.to_lowercase().contains("launchpad") && !p.is_virtual)
            .map(|p| p.name)
    }

    /// Input and output ports, in that order
    pub fn list_ports() -> Result<(Vec<PortInfo>, Vec<PortInfo>), DeviceError> {
        Ok((discover_input_ports()?, discover_output_ports()?))
    }

    /// Print discovered ports
    pub fn print_ports() {
        println!("\n{}", "🔍 Available MIDI Ports".bold().cyan());

        match list_ports() {
            Ok((inputs, outputs)) => {
                println!("\n{}", "Inputs:".bold());
                print_list(&inputs);
                println!("\n{}", "Outputs:".bold());
                print_list(&outputs);
            }
            Err(e) => println!("  {}", e.to_string().red()),
        }

        if let Some(name) = find_launchpad_port() {
            println!("\n✅ Launchpad detected: {}", name.green());
        }
        println!();
    }

    fn print_list(ports: &[PortInfo]) {
        if ports.is_empty() {
            println!("  {}", "(none)".dimmed());
        }
        for port in ports {
            let virtual_tag = if port.is_virtual { " [VIRTUAL]" } else { "" };
            println!("  {}: {}{}", port.index, port.name, virtual_tag.yellow());
        }
    }
}
