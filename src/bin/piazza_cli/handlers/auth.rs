#![deny(clippy::all, clippy::pedantic)]

use piazza_client::client::PiazzaClient;
use piazza_client::domain::Registration;

use crate::args::AuthCmd;
use crate::context::CliError;
use crate::print::print_json;

pub async fn handle(client: &PiazzaClient, cmd: AuthCmd) -> Result<(), CliError> {
    match cmd {
        AuthCmd::Login { email, password } => {
            let session = client.login(&email, &password).await?;
            print_json(&session.user)
        }
        AuthCmd::Register {
            name,
            username,
            email,
            phone,
            password,
        } => {
            let registration = Registration {
                name,
                username,
                email,
                phone,
                password,
            };
            let session = client.register(&registration).await?;
            print_json(&session.user)
        }
        AuthCmd::Logout => {
            client.logout().await?;
            Ok(())
        }
    }
}
