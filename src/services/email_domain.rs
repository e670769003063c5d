use hickory_resolver::TokioAsyncResolver;

/// Splits `local@domain` and returns the lowercased domain when the address
/// has the basic shape of one.
pub fn email_domain(email: &str) -> Option<String> {
    let (local, domain) = email.rsplit_once('@')?;
    let domain = domain.trim().trim_end_matches('.').to_ascii_lowercase();
    if local.is_empty() || domain.is_empty() || !domain.contains('.') {
        return None;
    }
    if domain.starts_with('.') || domain.chars().any(char::is_whitespace) {
        return None;
    }
    Some(domain)
}

/// Rejects signups whose domain cannot receive mail (no MX records).
pub struct EmailDomainValidator {
    resolver: Option<TokioAsyncResolver>,
}

impl EmailDomainValidator {
    pub fn new(enabled: bool) -> anyhow::Result<Self> {
        let resolver = if enabled {
            Some(TokioAsyncResolver::tokio_from_system_conf()?)
        } else {
            None
        };
        Ok(Self { resolver })
    }

    pub fn disabled() -> Self {
        Self { resolver: None }
    }

    pub async fn accepts_mail(&self, domain: &str) -> bool {
        let Some(resolver) = &self.resolver else {
            return true;
        };

        match resolver.mx_lookup(domain).await {
            Ok(lookup) => lookup.iter().next().is_some(),
            Err(e) => {
                tracing::debug!(%domain, error = %e, "MX lookup failed");
                false
            }
        }
    }
}
