use std::path::PathBuf;

use thiserror::Error;

use crate::tunnel::Mode;

#[derive(Debug, Error)]
pub enum TunnelError {
    #[error("no tienes instalado OpenSSH o no se encontró el comando '{0}'. Instala 'openssh-client'.")]
    SshMissing(String),
    #[error("Formato de reenvío {mode} inválido. Deberías utilizar algo como: {example}")]
    InvalidFormat { mode: Mode, example: &'static str },
    #[error("no se pudo ejecutar '{program}'")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("error esperando al proceso ssh")]
    Wait(#[source] std::io::Error),
    #[error("no se pudo guardar la configuración en {}", .path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
