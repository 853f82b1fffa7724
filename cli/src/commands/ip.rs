use std::net::IpAddr;
use std::process::ExitCode;

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use lanscope_common::config::Config;
use lanscope_core::{SessionController, SessionOptions};

use crate::commands::shell::ShellCommand;
use crate::commands::{IpArgs, open_session};
use crate::terminal::print;

const PROMPT: &str =
    "Enter IP [b]ypass cache, (c)lear cache [ip], (h)elp, (l)ist [ip], (f)ind str, (q)uit > ";

pub async fn ip(args: IpArgs, cfg: &Config) -> Result<ExitCode> {
    let (mut session, _) = open_session(cfg, SessionOptions::from(&cfg.discovery))?;

    if args.clear {
        let removed = session.clear(args.ip)?;
        info!("{removed} entries removed.");
        return Ok(ExitCode::SUCCESS);
    }

    if args.list {
        print::records(&session.list(args.ip));
        return Ok(ExitCode::SUCCESS);
    }

    match args.ip {
        Some(ip) => {
            lookup(&mut session, ip, false).await?;
        }
        None => {
            let stdin = BufReader::new(tokio::io::stdin());
            command_loop(&mut session, stdin).await?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

async fn lookup(session: &mut SessionController, ip: IpAddr, bypass: bool) -> Result<()> {
    if bypass {
        warn!("  Bypass requested.");
    }
    let outcome = session.lookup(ip, bypass).await?;
    if outcome.from_cache {
        debug!("{ip} answered from cache");
    }
    print::records(&[&outcome.record]);
    Ok(())
}

/// Reads commands until `q` or end of input. Bad input is reported and the
/// loop goes on.
pub async fn command_loop<R>(session: &mut SessionController, input: R) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    print::help_screen();
    let mut lines = input.lines();

    loop {
        print::blank();
        print::prompt(PROMPT)?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        let command = match ShellCommand::parse(&line) {
            Ok(command) => command,
            Err(e) => {
                warn!("  {e}");
                continue;
            }
        };

        match command {
            ShellCommand::Quit => break,
            ShellCommand::Empty => {}
            ShellCommand::Help => print::help_screen(),
            ShellCommand::Lookup { ip, bypass } => {
                if let Err(e) = lookup(session, ip, bypass).await {
                    warn!("  {e:#}");
                }
            }
            ShellCommand::Clear(Some(ip)) => report_cleared(session.clear(Some(ip))),
            ShellCommand::Clear(None) => {
                print::prompt(" Are you sure? (y/n)? ")?;
                let answer = lines.next_line().await?.unwrap_or_default();
                if answer.trim().eq_ignore_ascii_case("y") {
                    report_cleared(session.clear(None));
                }
            }
            ShellCommand::Find(search) => print::records(&session.find(&search)),
            ShellCommand::List(ip) => print::records(&session.list(ip)),
        }
    }

    Ok(())
}

fn report_cleared<E: std::fmt::Display>(result: std::result::Result<usize, E>) {
    match result {
        Ok(removed) => info!("  {removed} entries removed from cache."),
        Err(e) => warn!("  {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use lanscope_common::vendors::VendorRepository;
    use lanscope_core::{CacheStore, ClientResolver, HostnameResolver, IpInfoSource, OverrideTable};
    use pnet::util::MacAddr;
    use serde_json::{Value, json};

    struct NoNames;

    #[async_trait]
    impl HostnameResolver for NoNames {
        async fn reverse_lookup(&self, _ip: IpAddr) -> Option<String> {
            None
        }
    }

    struct NoVendors;

    impl VendorRepository for NoVendors {
        fn get_vendor(&self, _mac: MacAddr) -> Option<String> {
            None
        }
    }

    struct Echo;

    #[async_trait]
    impl IpInfoSource for Echo {
        async fn fetch(&self, ip: IpAddr) -> Result<Value> {
            Ok(json!({ "ip": ip.to_string(), "scope": "test" }))
        }
    }

    fn session() -> SessionController {
        let resolver = ClientResolver::new(
            Arc::new(NoNames),
            Arc::new(NoVendors),
            Arc::new(OverrideTable::empty()),
        );
        SessionController::new(
            CacheStore::in_memory(),
            Arc::new(resolver),
            Arc::new(Echo),
            SessionOptions::default(),
        )
    }

    #[tokio::test]
    async fn loop_runs_commands_until_quit() {
        let mut session = session();
        let input: &[u8] = b"10.0.0.1\n10.0.0.2 b\nbogus\nf 10.0.0.2\n\nc 10.0.0.1\nq\n10.0.0.3\n";

        command_loop(&mut session, input).await.unwrap();

        let keys: Vec<&str> = session.list(None).iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["10.0.0.2"]);
    }

    #[tokio::test]
    async fn clear_all_needs_confirmation() {
        let mut session = session();
        let input: &[u8] = b"10.0.0.1\nc\nn\nl\nc\nY\n";

        command_loop(&mut session, input).await.unwrap();

        assert!(session.list(None).is_empty());
    }

    #[tokio::test]
    async fn declined_clear_keeps_entries() {
        let mut session = session();
        let input: &[u8] = b"10.0.0.1\nc\nn\n";

        command_loop(&mut session, input).await.unwrap();

        assert_eq!(session.list(None).len(), 1);
    }
}
