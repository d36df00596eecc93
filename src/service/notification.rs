use uuid::Uuid;

use crate::models::notification::Notification;
use crate::service::Scheduler;

impl Scheduler {
    /// All notifications for one user, most recent first.
    pub async fn notifications_for(&self, user_id: Uuid) -> Vec<Notification> {
        self.read().await.notifications_for(user_id)
    }

    /// Bulk-acknowledge; returns how many were newly marked.
    pub async fn mark_notifications_read(&self, user_id: Uuid) -> usize {
        let mut store = self.write().await;
        let mut marked = 0;
        for notification in store.notifications.iter_mut().filter(|n| n.user_id == user_id && !n.read) {
            notification.read = true;
            marked += 1;
        }
        marked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;
    use crate::test_utils::scheduler_with;

    #[tokio::test]
    async fn mark_all_read_touches_only_the_callers_unread() {
        let mut store = Store::new();
        let me = Uuid::new_v4();
        let other = Uuid::new_v4();
        store.notify(me, "first");
        store.notify(me, "second");
        store.notify(other, "not mine");
        store.notifications[0].read = true;
        let scheduler = scheduler_with(store);

        assert_eq!(scheduler.mark_notifications_read(me).await, 1);
        assert_eq!(scheduler.mark_notifications_read(me).await, 0);

        let mine = scheduler.notifications_for(me).await;
        assert!(mine.iter().all(|n| n.read));
        let theirs = scheduler.notifications_for(other).await;
        assert!(!theirs[0].read);
    }
}
