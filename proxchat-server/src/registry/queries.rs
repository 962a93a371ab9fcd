//! Query methods for ConnectionRegistry

use proxchat_common::Identity;

use super::ConnectionRegistry;

impl ConnectionRegistry {
    /// Registered identities in join order
    pub async fn identities(&self) -> Vec<Identity> {
        let connections = self.connections.read().await;
        connections.values().map(|c| c.identity.clone()).collect()
    }

    /// Number of registered connections
    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Whether no connection is registered
    pub async fn is_empty(&self) -> bool {
        self.connections.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_identities_in_join_order() {
        let registry = ConnectionRegistry::new();
        let addr = "127.0.0.1:5000".parse().unwrap();
        let mut receivers = Vec::new();

        for name in ["Zed", "Amy", "Kim"] {
            let (tx, rx) = mpsc::channel(16);
            receivers.push(rx);
            registry.register(Identity::new(name), addr, tx).await.unwrap();
        }

        let names: Vec<String> = registry
            .identities()
            .await
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(names, vec!["Zed", "Amy", "Kim"]);
        assert_eq!(registry.len().await, 3);
    }
}
