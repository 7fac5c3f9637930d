#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KrbError {
    // =========================================================================================
    // IMPORTANT: Don't add variables to variants in this enum - it's a potential security risk
    // as you can leak internal state in an error as these can end up in userfacing contexts!!!
    //
    // In other words, any extra information you add here is a potential CVE.
    //
    // If you want to debug the error, then use the error! macro at the error raise site to
    // report relevant information.
    //
    // Lastly, the whole reason we have so many error variants is so that just from the error
    // variant alone, we already have a large amount of anonymised detail about the potential
    // cause the error.
    // =========================================================================================

    // Crypto.
    InvalidHmacKey,
    InvalidEncryptionKey,
    MessageAuthenticationFailed,
    PlaintextEmpty,
    InsufficientData,
    CtsCiphertextInvalid,
    UnsupportedEncryption,
    UnsupportedChecksum,
    WrongKeyType,

    // DER codec.
    DerEncodeTicket,
    DerDecodeTicket,
    DerEncodeEncTicketPart,
    DerDecodeEncTicketPart,
    DerEncodeAuthenticator,
    DerDecodeAuthenticator,
    DerDecodeKrbError,
    DerEncodeKrbError,
    DerEncodeOctetString,
    DerEncodeKerberosString,
    DerEncodeKerberosTime,
    TicketVersionInvalid,
    TicketSequenceInvalid,

    // NDR and PAC codec.
    NdrTruncated,
    NdrHeaderInvalid,
    NdrStringInvalid,
    PacTruncated,
    PacVersionInvalid,
    PacBufferMisaligned,
    PacBufferOutOfBounds,
    PacTrailingBytes,
    PacClientInfoInvalid,
    PacCredentialsVersionInvalid,
    PacMissingSignature,
    PacChecksumFailed,
    SidRevisionInvalid,
    SidSubAuthorityCountMismatch,
    UnicodeStringHeaderInvalid,

    // Names and principals.
    NameNotServicePrincipal,
    PrincipalNameInvalidComponents,

    // Time handling.
    TimeOutOfRange,
    TicketTimeBoundsInvalid,

    // Configuration.
    NoKdcsForRealm,
    KeytabNoKey,

    // Transport.
    KdcAddressInvalid,
    KdcConnectionFailed,
    KdcWriteFailed,
    KdcReadFailed,
    KdcResponseEmpty,
}
