use creditline::domain::money::MinorUnits;
use creditline::domain::ports::{TransactionStoreRef, WalletStoreRef, WebhookInboxRef};
use creditline::domain::transaction::{Channel, Transaction, TransactionStatus, TransactionType};
use creditline::domain::wallet::Wallet;
use creditline::infrastructure::in_memory::{
    InMemoryTransactionStore, InMemoryWalletStore, InMemoryWebhookInbox,
};
use std::sync::Arc;
use uuid::Uuid;

#[tokio::test]
async fn test_stores_as_trait_objects() {
    let wallet_store: WalletStoreRef = Arc::new(InMemoryWalletStore::new());
    let transaction_store: TransactionStoreRef = Arc::new(InMemoryTransactionStore::new());
    let inbox: WebhookInboxRef = Arc::new(InMemoryWebhookInbox::new());

    let mut wallet = Wallet::new(Uuid::new_v4(), "acct_1", "cus_1");
    wallet.set_credit_limit(MinorUnits(10_000));
    let wallet_id = wallet.id;

    let tx = Transaction::debit(
        &wallet,
        MinorUnits(2_500),
        TransactionType::Withdrawal,
        Channel::Pos,
        TransactionStatus::Pending,
    )
    .with_reference("evt_1");
    let tx_id = tx.id;

    // Verify Send + Sync by spawning tasks
    let ws_handle = {
        let wallet_store = wallet_store.clone();
        tokio::spawn(async move {
            wallet_store.insert(wallet).await.unwrap();
            let guard = wallet_store.lock_for_update(wallet_id).await.unwrap();
            let mut locked = guard.wallet().clone();
            locked.debit(MinorUnits(2_500)).unwrap();
            guard.commit(locked).await.unwrap();
            wallet_store.get(wallet_id).await.unwrap().unwrap()
        })
    };

    let ts_handle = tokio::spawn(async move {
        transaction_store.store(tx).await.unwrap();
        transaction_store.find_by_reference("evt_1").await.unwrap()
    });

    let inbox_handle = tokio::spawn(async move {
        let first = inbox.begin("authorization.request:evt_1").await.unwrap();
        let second = inbox.begin("authorization.request:evt_1").await.unwrap();
        (first, second)
    });

    let retrieved_wallet = ws_handle.await.unwrap();
    assert_eq!(retrieved_wallet.available_credit, MinorUnits(7_500));

    let retrieved_txs = ts_handle.await.unwrap();
    assert_eq!(retrieved_txs.len(), 1);
    assert_eq!(retrieved_txs[0].id, tx_id);

    assert_eq!(inbox_handle.await.unwrap(), (true, false));

    // an uncommitted guard leaves the row untouched
    let guard = wallet_store.lock_for_update(wallet_id).await.unwrap();
    drop(guard);
    assert_eq!(
        wallet_store.get(wallet_id).await.unwrap().unwrap(),
        retrieved_wallet
    );
}
