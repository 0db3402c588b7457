//! Parsing of `function` + string-argument invocations into typed commands.
//!
//! Arity and argument shape are checked here, before any ledger access, so
//! a malformed invocation never opens a snapshot.

use crate::error::ChaincodeError;
use crate::escalator::{EscalatorState, Fault};
use crate::lifecycle::Transition;
use crate::ticket::NewTicket;
use crate::Result;

/// A validated chaincode command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    // Mutating
    CreateEscalator {
        station: String,
        platform: String,
    },
    SetEscalatorState {
        escalator_id: String,
        state: EscalatorState,
    },
    CreateSla {
        service_provider: String,
        time_to_arrive: i64,
        time_to_repair: i64,
    },
    CreateTicket(NewTicket),
    CreateDefaultTicket,
    Advance {
        ticket_id: String,
        transition: Transition,
    },

    // Read-only
    GetFullTicket(String),
    GetTicketCounter,
    GetEscalatorState(String),
    GetSla(String),
    GetTicketsByRange {
        start: String,
        end: String,
    },
    GetAllTickets,
    GetTicketsByStatus {
        status: String,
        service_provider: Option<String>,
    },
    GetTicketsByServiceProvider(String),
    GetTicketsByMechanic {
        service_provider: String,
        employee: String,
    },
    GetAssignedSpTickets(String),
    GetWipTickets(String),
    GetNewSpTickets(String),
}

impl Command {
    /// Parse an invocation. Unknown names fail with `UnknownFunction`, wrong
    /// arity or shape with `InvalidArguments`.
    pub fn parse(function: &str, args: &[String]) -> Result<Command> {
        let a = Args { function, args };
        let command = match function {
            "createEscalator" => {
                let [station, platform] = a.exact::<2>()?;
                Command::CreateEscalator { station, platform }
            }
            "setEscalatorState" => parse_escalator_state(&a)?,
            "createSLA" => {
                let [service_provider, tta, ttr] = a.exact::<3>()?;
                if !service_provider.is_empty()
                    && service_provider.chars().all(|c| c.is_ascii_digit())
                {
                    return Err(a.invalid(format!(
                        "service provider name '{}' must not be purely numeric",
                        service_provider
                    )));
                }
                Command::CreateSla {
                    service_provider,
                    time_to_arrive: a.seconds("timeToArrive", &tta)?,
                    time_to_repair: a.seconds("timeToRepair", &ttr)?,
                }
            }
            "createTicket" => {
                // A leading caller timestamp is tolerated for older clients
                // and ignored; creation time always comes from the ledger.
                let fields = match args.len() {
                    6 => args,
                    7 => &args[1..],
                    n => {
                        return Err(a.invalid(format!("expected 6 arguments, got {}", n)));
                    }
                };
                let [trainstation, platform, device, tech_part, error_id, error_message] =
                    <[String; 6]>::try_from(fields.to_vec())
                        .map_err(|_| a.invalid("expected 6 arguments"))?;
                Command::CreateTicket(NewTicket {
                    trainstation,
                    platform,
                    device,
                    tech_part,
                    error_id,
                    error_message,
                })
            }
            "createDefaultTicket" => {
                a.exact::<0>()?;
                Command::CreateDefaultTicket
            }
            "assignTicket" => {
                let [ticket_id, service_provider] = a.exact::<2>()?;
                Command::Advance {
                    ticket_id,
                    transition: Transition::Assign { service_provider },
                }
            }
            "assignMechanic" => {
                let [ticket_id, employee] = a.exact::<2>()?;
                Command::Advance {
                    ticket_id,
                    transition: Transition::AssignMechanic { employee },
                }
            }
            "startJourney" => a.step(Transition::StartJourney)?,
            "startRepair" => a.step(Transition::StartRepair)?,
            "finishRepair" => a.step(Transition::FinishRepair)?,
            "onArrival" => {
                let [ticket_id, commentary, estimated_repair_time] = a.exact::<3>()?;
                Command::Advance {
                    ticket_id,
                    transition: Transition::Arrive {
                        commentary,
                        estimated_repair_time,
                    },
                }
            }
            "writeFinalReport" => {
                let [ticket_id, report] = a.exact::<2>()?;
                Command::Advance {
                    ticket_id,
                    transition: Transition::FileFinalReport { report },
                }
            }

            "getFullTicket" => {
                let [id] = a.exact::<1>()?;
                Command::GetFullTicket(id)
            }
            "getTicketCounter" => {
                a.exact::<0>()?;
                Command::GetTicketCounter
            }
            "getEscalatorState" => {
                let [id] = a.exact::<1>()?;
                Command::GetEscalatorState(id)
            }
            "getSLA" => {
                let [provider] = a.exact::<1>()?;
                Command::GetSla(provider)
            }
            "getTicketsByRange" => {
                let [start, end] = a.exact::<2>()?;
                Command::GetTicketsByRange { start, end }
            }
            "getAllTickets" => {
                a.exact::<0>()?;
                Command::GetAllTickets
            }
            "getTicketsByStatus" => match args {
                [status] => Command::GetTicketsByStatus {
                    status: status.clone(),
                    service_provider: None,
                },
                [status, provider] => Command::GetTicketsByStatus {
                    status: status.clone(),
                    service_provider: Some(provider.clone()),
                },
                _ => {
                    return Err(a.invalid(format!("expected 1 or 2 arguments, got {}", args.len())))
                }
            },
            "getTicketsByServiceProvider" => {
                let [provider] = a.exact::<1>()?;
                Command::GetTicketsByServiceProvider(provider)
            }
            "getTicketsByMechanic" => {
                let [service_provider, employee] = a.exact::<2>()?;
                Command::GetTicketsByMechanic {
                    service_provider,
                    employee,
                }
            }
            "getAssignedSPTickets" => {
                let [provider] = a.exact::<1>()?;
                Command::GetAssignedSpTickets(provider)
            }
            "getWIPTickets" => {
                let [provider] = a.exact::<1>()?;
                Command::GetWipTickets(provider)
            }
            "getNewSPTickets" => {
                let [provider] = a.exact::<1>()?;
                Command::GetNewSpTickets(provider)
            }
            other => return Err(ChaincodeError::UnknownFunction(other.to_string())),
        };
        Ok(command)
    }

    /// Whether the command only reads the ledger.
    pub fn is_read_only(&self) -> bool {
        matches!(
            self,
            Command::GetFullTicket(_)
                | Command::GetTicketCounter
                | Command::GetEscalatorState(_)
                | Command::GetSla(_)
                | Command::GetTicketsByRange { .. }
                | Command::GetAllTickets
                | Command::GetTicketsByStatus { .. }
                | Command::GetTicketsByServiceProvider(_)
                | Command::GetTicketsByMechanic { .. }
                | Command::GetAssignedSpTickets(_)
                | Command::GetWipTickets(_)
                | Command::GetNewSpTickets(_)
        )
    }
}

fn parse_escalator_state(a: &Args<'_>) -> Result<Command> {
    let (escalator_id, flag) = match a.args {
        [id, flag, ..] => (id.clone(), flag.as_str()),
        _ => return Err(a.invalid(format!("expected 2 or 5 arguments, got {}", a.args.len()))),
    };
    let working = parse_bool(flag).ok_or_else(|| {
        a.invalid(format!(
            "working flag must be 'true' or 'false', got '{}'",
            flag
        ))
    })?;
    let state = match (working, &a.args[2..]) {
        (true, []) => EscalatorState::Working,
        (false, [tech_part, error_id, error_message]) => EscalatorState::Broken(Fault {
            tech_part: tech_part.clone(),
            error_id: error_id.clone(),
            error_message: error_message.clone(),
        }),
        (true, rest) => {
            return Err(a.invalid(format!(
                "a working report takes 2 arguments, got {}",
                2 + rest.len()
            )))
        }
        (false, rest) => {
            return Err(a.invalid(format!(
                "a failure report takes 5 arguments, got {}",
                2 + rest.len()
            )))
        }
    };
    Ok(Command::SetEscalatorState {
        escalator_id,
        state,
    })
}

fn parse_bool(s: &str) -> Option<bool> {
    if s.eq_ignore_ascii_case("true") {
        Some(true)
    } else if s.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

struct Args<'a> {
    function: &'a str,
    args: &'a [String],
}

impl Args<'_> {
    fn invalid(&self, message: impl Into<String>) -> ChaincodeError {
        ChaincodeError::invalid_args(self.function, message)
    }

    fn exact<const N: usize>(&self) -> Result<[String; N]> {
        <[String; N]>::try_from(self.args.to_vec()).map_err(|_| {
            self.invalid(format!("expected {} arguments, got {}", N, self.args.len()))
        })
    }

    /// Single-argument workflow step taking only the ticket ID.
    fn step(&self, transition: Transition) -> Result<Command> {
        let [ticket_id] = self.exact::<1>()?;
        Ok(Command::Advance {
            ticket_id,
            transition,
        })
    }

    fn seconds(&self, name: &str, raw: &str) -> Result<i64> {
        match raw.trim().parse::<i64>() {
            Ok(v) if v >= 0 => Ok(v),
            _ => Err(self.invalid(format!(
                "{} must be a non-negative number of seconds, got '{}'",
                name, raw
            ))),
        }
    }
}
